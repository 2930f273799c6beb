//! Backend resource managers.
//!
//! A [`Backend`] performs the OS-level work behind every object handler:
//! link state, IPv4 addresses, main-table routes, ARP entries and VLANs.
//! The dispatcher is generic over it, so the same handlers run against
//! rtnetlink ([`NetlinkBackend`]), ioctl sockets plus procfs
//! ([`IoctlBackend`]) or the in-memory fake ([`MemoryBackend`]).
//!
//! Each operation is one self-contained OS interaction: it validates and
//! fails on its own, and leaves live state unchanged when it fails.

mod ioctl;
mod memory;
mod netlink;

use std::net::Ipv4Addr;

use tracing::warn;

pub use ioctl::IoctlBackend;
pub use memory::{Fault, MemoryBackend};
pub use netlink::NetlinkBackend;

use crate::error::{Error, Result};
use crate::key::{RouteKey, encode_route};
use crate::netlink::types::iff;

/// Finite, non-restartable listing of instance names.
pub type Tokens = std::vec::IntoIter<String>;

/// A network interface (including `ethX:N` aliases on backends that
/// report them as interfaces).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub name: String,
    pub index: u32,
    pub mtu: u32,
    /// IFF_* flags.
    pub flags: u32,
    pub address: Option<[u8; 6]>,
}

impl LinkInfo {
    /// Check if the interface is administratively up.
    pub fn is_up(&self) -> bool {
        self.flags & iff::UP != 0
    }

    /// Check if ARP is enabled (IFF_NOARP clear).
    pub fn arp_enabled(&self) -> bool {
        self.flags & iff::NOARP == 0
    }
}

/// An IPv4 address as currently configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetAddress {
    /// Label the address is reported under (`eth0` or `eth0:1`).
    pub ifname: String,
    /// Physical interface carrying the address.
    pub link: String,
    pub address: Ipv4Addr,
    pub prefix: u8,
    pub broadcast: Option<Ipv4Addr>,
}

impl NetAddress {
    /// Check if the address belongs to `ifname`, by label or by link.
    pub fn is_on(&self, ifname: &str) -> bool {
        self.ifname == ifname || self.link == ifname
    }
}

/// An IPv4 neighbor (ARP) entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborEntry {
    pub address: Ipv4Addr,
    pub lladdr: Option<[u8; 6]>,
    pub ifname: String,
    pub permanent: bool,
    /// Resolved: carries a usable link-layer address.
    pub complete: bool,
}

/// The single backend call issued when a staged route is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteChange {
    /// Create the route.
    Create(RouteKey),
    /// Replace the route named by `current` with `desired`.
    Replace { current: RouteKey, desired: RouteKey },
    /// Delete the route.
    Delete(RouteKey),
}

/// Operations every backend provides.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    // Interfaces

    /// All interfaces, in enumeration order.
    async fn interfaces(&mut self) -> Result<Vec<LinkInfo>>;

    /// One interface by name.
    async fn interface(&mut self, name: &str) -> Result<LinkInfo> {
        self.interfaces()
            .await?
            .into_iter()
            .find(|l| l.name == name)
            .ok_or_else(|| Error::not_found(format!("interface {}", name)))
    }

    async fn interface_exists(&mut self, name: &str) -> Result<bool> {
        Ok(self.interfaces().await?.iter().any(|l| l.name == name))
    }

    async fn list_interfaces(&mut self) -> Result<Tokens> {
        let names: Vec<String> = self.interfaces().await?.into_iter().map(|l| l.name).collect();
        Ok(names.into_iter())
    }

    /// Create VLAN `vid` on `base`, named `base.vid`.
    async fn vlan_add(&mut self, base: &str, vid: u16) -> Result<()>;

    /// Delete the VLAN interface `name`.
    async fn vlan_delete(&mut self, name: &str) -> Result<()>;

    async fn set_link_up(&mut self, name: &str, up: bool) -> Result<()>;

    async fn set_link_arp(&mut self, name: &str, enabled: bool) -> Result<()>;

    async fn set_link_mtu(&mut self, name: &str, mtu: u32) -> Result<()>;

    // Addresses

    /// All IPv4 addresses on all interfaces.
    async fn addresses(&mut self) -> Result<Vec<NetAddress>>;

    /// Addresses of `ifname`, as dotted quads.
    async fn list_addresses(&mut self, ifname: &str) -> Result<Tokens> {
        let addrs: Vec<String> = self
            .addresses()
            .await?
            .into_iter()
            .filter(|a| a.is_on(ifname))
            .map(|a| a.address.to_string())
            .collect();
        Ok(addrs.into_iter())
    }

    /// The interface address equal to `addr`, on any interface.
    async fn find_address(&mut self, addr: Ipv4Addr) -> Result<Option<NetAddress>> {
        Ok(self
            .addresses()
            .await?
            .into_iter()
            .find(|a| a.address == addr))
    }

    /// Add `addr/prefix` to `ifname`.
    ///
    /// Backends without multiple addresses per interface put a second
    /// address on a numbered alias. If setting the prefix fails after the
    /// address was set, the address is removed again.
    async fn address_add(
        &mut self,
        ifname: &str,
        addr: Ipv4Addr,
        prefix: u8,
        broadcast: Option<Ipv4Addr>,
    ) -> Result<()>;

    /// Remove `addr` from `ifname`. An address the OS reports as not
    /// available counts as removed.
    async fn address_delete(&mut self, ifname: &str, addr: Ipv4Addr) -> Result<()>;

    /// Change the prefix length of `addr`, recomputing its broadcast.
    async fn address_set_prefix(&mut self, ifname: &str, addr: Ipv4Addr, prefix: u8)
    -> Result<()>;

    async fn address_set_broadcast(
        &mut self,
        ifname: &str,
        addr: Ipv4Addr,
        broadcast: Ipv4Addr,
    ) -> Result<()>;

    // Routes

    /// All IPv4 main-table routes with their live attributes.
    async fn routes(&mut self) -> Result<Vec<RouteKey>>;

    /// Route names as listed: the full instance name of every live route,
    /// so routes that differ only in an attribute list apart.
    async fn list_routes(&mut self) -> Result<Tokens> {
        let names: Vec<String> = self.routes().await?.iter().map(encode_route).collect();
        Ok(names.into_iter())
    }

    /// Issue one create, replace or delete.
    async fn route_replace_or_delete(&mut self, change: &RouteChange) -> Result<()>;

    // Neighbors

    /// All IPv4 neighbor entries.
    async fn neighbors(&mut self) -> Result<Vec<NeighborEntry>>;

    /// Complete entries that are dynamic (`volatile`) or static.
    async fn list_neighbors(&mut self, volatile: bool) -> Result<Tokens> {
        let addrs: Vec<String> = self
            .neighbors()
            .await?
            .into_iter()
            .filter(|n| n.complete && n.permanent != volatile)
            .map(|n| n.address.to_string())
            .collect();
        Ok(addrs.into_iter())
    }

    /// Create or replace the entry for `addr`.
    async fn neighbor_set(&mut self, addr: Ipv4Addr, mac: [u8; 6], permanent: bool)
    -> Result<()>;

    /// Delete the entry for `addr`. Entries the OS reports as already gone
    /// count as deleted.
    async fn neighbor_delete(&mut self, addr: Ipv4Addr) -> Result<()>;
}

/// Treat "neighbor already gone" replies as success.
pub(crate) fn neighbor_gone_ok(addr: Ipv4Addr, result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_neighbor_gone() => {
            warn!("neighbor {} already gone: {}", addr, e);
            Ok(())
        }
        other => other,
    }
}

/// Treat EADDRNOTAVAIL on address removal as success.
pub(crate) fn address_gone_ok(addr: Ipv4Addr, result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.errno() == Some(libc::EADDRNOTAVAIL) => {
            warn!("address {} already removed", addr);
            Ok(())
        }
        other => other,
    }
}

/// Split a VLAN name `base.vid`, validating the id range 1..=4094.
pub fn parse_vlan_name(name: &str) -> Result<(&str, u16)> {
    let (base, vid) = name
        .rsplit_once('.')
        .ok_or_else(|| Error::InvalidValue(format!("{} is not a VLAN name", name)))?;
    let vid: u16 = vid
        .parse()
        .map_err(|_| Error::InvalidValue(format!("{} is not a VLAN name", name)))?;
    if base.is_empty() || !(1..=4094).contains(&vid) {
        return Err(Error::InvalidValue(format!("{} is not a VLAN name", name)));
    }
    Ok((base, vid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_vlan_name() {
        assert_eq!(parse_vlan_name("eth0.5").unwrap(), ("eth0", 5));
        assert_eq!(parse_vlan_name("br.0.4094").unwrap(), ("br.0", 4094));
        for bad in ["eth0", "eth0.0", "eth0.4095", "eth0.x", ".5"] {
            assert_eq!(
                parse_vlan_name(bad).unwrap_err().kind(),
                ErrorKind::InvalidValue,
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_gone_helpers() {
        let a = Ipv4Addr::new(10, 0, 0, 1);
        assert!(neighbor_gone_ok(a, Err(Error::from_errno(libc::ENXIO))).is_ok());
        assert!(neighbor_gone_ok(a, Err(Error::from_errno(libc::EPERM))).is_err());
        assert!(address_gone_ok(a, Err(Error::from_errno(libc::EADDRNOTAVAIL))).is_ok());
        assert!(address_gone_ok(a, Err(Error::from_errno(libc::EPERM))).is_err());
    }

    #[test]
    fn test_address_is_on() {
        let addr = NetAddress {
            ifname: "eth0:1".into(),
            link: "eth0".into(),
            address: Ipv4Addr::new(10, 0, 0, 6),
            prefix: 24,
            broadcast: None,
        };
        assert!(addr.is_on("eth0"));
        assert!(addr.is_on("eth0:1"));
        assert!(!addr.is_on("eth1"));
    }
}
