//! In-memory backend for tests.
//!
//! Models either a platform with native multi-address interfaces (like
//! rtnetlink) or one without, where every further address goes on an
//! `ethX:N` alias (like the ioctl backend). Faults can be injected per
//! operation to exercise error paths and rollbacks.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use tracing::warn;

use super::{
    Backend, LinkInfo, NeighborEntry, NetAddress, RouteChange, address_gone_ok, neighbor_gone_ok,
};
use crate::alias::{alias_name, allocate_slot};
use crate::error::{Error, Result};
use crate::key::{RouteKey, broadcast_for};
use crate::netlink::types::iff;
use crate::util::{base_ifname, ipv4_in_prefix};

/// Operations a fault can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    LinkSet,
    VlanAdd,
    VlanDelete,
    AddressAdd,
    /// The prefix step of an address add, or a prefix change.
    AddressPrefix,
    AddressDelete,
    RouteChange,
    NeighborSet,
    NeighborDelete,
}

/// Backend keeping all state in memory.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    native_aliases: bool,
    links: Vec<LinkInfo>,
    addrs: Vec<NetAddress>,
    routes: Vec<RouteKey>,
    neighbors: Vec<NeighborEntry>,
    faults: HashMap<Fault, i32>,
    route_log: Vec<RouteChange>,
    next_index: u32,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// A host with `lo` (127.0.0.1/8) and an address-less, up `eth0`.
    pub fn new() -> Self {
        let mut backend = Self {
            native_aliases: true,
            links: Vec::new(),
            addrs: Vec::new(),
            routes: Vec::new(),
            neighbors: Vec::new(),
            faults: HashMap::new(),
            route_log: Vec::new(),
            next_index: 1,
        };
        backend.push_link("lo", None);
        backend.push_link("eth0", Some([0x02, 0, 0, 0, 0, 0x01]));
        backend.addrs.push(NetAddress {
            ifname: "lo".into(),
            link: "lo".into(),
            address: Ipv4Addr::LOCALHOST,
            prefix: 8,
            broadcast: None,
        });
        backend
    }

    /// Model a platform without multiple addresses per interface.
    pub fn without_native_aliases(mut self) -> Self {
        self.native_aliases = false;
        self
    }

    /// Add an up interface with a 1500 byte MTU.
    pub fn with_interface(mut self, name: &str, mac: [u8; 6]) -> Self {
        self.push_link(name, Some(mac));
        self
    }

    /// Seed a live route.
    pub fn with_route(mut self, key: RouteKey) -> Self {
        self.routes.push(key);
        self
    }

    /// Seed a neighbor entry.
    pub fn with_neighbor(mut self, entry: NeighborEntry) -> Self {
        self.neighbors.push(entry);
        self
    }

    /// Make the next call of `op` fail with `errno`.
    pub fn fail_next(&mut self, op: Fault, errno: i32) {
        self.faults.insert(op, errno);
    }

    /// Every route change issued, in order, including failed ones.
    pub fn route_log(&self) -> &[RouteChange] {
        &self.route_log
    }

    fn push_link(&mut self, name: &str, address: Option<[u8; 6]>) {
        self.links.push(LinkInfo {
            name: name.to_owned(),
            index: self.next_index,
            mtu: if address.is_some() { 1500 } else { 65536 },
            flags: iff::UP | iff::RUNNING,
            address,
        });
        self.next_index += 1;
    }

    fn fault(&mut self, op: Fault) -> Result<()> {
        match self.faults.remove(&op) {
            Some(errno) => Err(Error::from_errno(errno)),
            None => Ok(()),
        }
    }

    fn link_mut(&mut self, name: &str) -> Result<&mut LinkInfo> {
        let base = base_ifname(name);
        self.links
            .iter_mut()
            .find(|l| l.name == base)
            .ok_or_else(|| Error::from_errno(libc::ENODEV).with_context(base.to_owned()))
    }

    fn update_flags(&mut self, name: &str, set: u32, clear: u32) -> Result<()> {
        self.fault(Fault::LinkSet)?;
        let link = self.link_mut(name)?;
        link.flags = (link.flags | set) & !clear;
        Ok(())
    }

    fn address_mut(&mut self, ifname: &str, addr: Ipv4Addr) -> Result<&mut NetAddress> {
        self.addrs
            .iter_mut()
            .find(|a| a.address == addr && a.is_on(ifname))
            .ok_or_else(|| Error::from_errno(libc::EADDRNOTAVAIL))
    }

    fn alias_labels(&self) -> impl Iterator<Item = &str> {
        self.addrs
            .iter()
            .filter(|a| a.ifname != a.link)
            .map(|a| a.ifname.as_str())
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn interfaces(&mut self) -> Result<Vec<LinkInfo>> {
        let mut links = self.links.clone();
        if !self.native_aliases {
            for label in self.alias_labels() {
                if let Some(base) = self.links.iter().find(|l| l.name == base_ifname(label)) {
                    links.push(LinkInfo {
                        name: label.to_owned(),
                        ..base.clone()
                    });
                }
            }
        }
        Ok(links)
    }

    async fn vlan_add(&mut self, base: &str, vid: u16) -> Result<()> {
        self.fault(Fault::VlanAdd)?;
        let mac = self.link_mut(base)?.address;
        let name = format!("{}.{}", base, vid);
        if self.links.iter().any(|l| l.name == name) {
            return Err(Error::from_errno(libc::EEXIST).with_context(name));
        }
        self.push_link(&name, mac);
        Ok(())
    }

    async fn vlan_delete(&mut self, name: &str) -> Result<()> {
        self.fault(Fault::VlanDelete)?;
        let before = self.links.len();
        self.links.retain(|l| l.name != name);
        if self.links.len() == before {
            return Err(Error::from_errno(libc::ENODEV).with_context(name.to_owned()));
        }
        self.addrs.retain(|a| a.link != name);
        Ok(())
    }

    async fn set_link_up(&mut self, name: &str, up: bool) -> Result<()> {
        if up {
            self.update_flags(name, iff::UP, 0)
        } else {
            self.update_flags(name, 0, iff::UP)
        }
    }

    async fn set_link_arp(&mut self, name: &str, enabled: bool) -> Result<()> {
        if enabled {
            self.update_flags(name, 0, iff::NOARP)
        } else {
            self.update_flags(name, iff::NOARP, 0)
        }
    }

    async fn set_link_mtu(&mut self, name: &str, mtu: u32) -> Result<()> {
        self.fault(Fault::LinkSet)?;
        if !(68..=65536).contains(&mtu) {
            return Err(Error::from_errno(libc::EINVAL).with_context(format!("mtu {}", mtu)));
        }
        self.link_mut(name)?.mtu = mtu;
        Ok(())
    }

    async fn addresses(&mut self) -> Result<Vec<NetAddress>> {
        Ok(self.addrs.clone())
    }

    async fn address_add(
        &mut self,
        ifname: &str,
        addr: Ipv4Addr,
        prefix: u8,
        broadcast: Option<Ipv4Addr>,
    ) -> Result<()> {
        self.fault(Fault::AddressAdd)?;
        let base = base_ifname(ifname).to_owned();
        self.link_mut(&base)?;
        if self.addrs.iter().any(|a| a.address == addr) {
            return Err(Error::from_errno(libc::EEXIST).with_context(addr.to_string()));
        }

        let label = if !self.native_aliases && self.addrs.iter().any(|a| a.ifname == ifname) {
            let names: Vec<&str> = self
                .links
                .iter()
                .map(|l| l.name.as_str())
                .chain(self.alias_labels())
                .collect();
            alias_name(&base, allocate_slot(names, &base)?)
        } else {
            ifname.to_owned()
        };

        self.addrs.push(NetAddress {
            ifname: label.clone(),
            link: base,
            address: addr,
            prefix: 32,
            broadcast: None,
        });

        if let Err(e) = self.fault(Fault::AddressPrefix) {
            warn!("rolling back {} on {}: {}", addr, label, e);
            self.addrs.retain(|a| a.address != addr);
            return Err(e);
        }
        let entry = self.address_mut(&label, addr)?;
        entry.prefix = prefix;
        entry.broadcast = broadcast;
        Ok(())
    }

    async fn address_delete(&mut self, ifname: &str, addr: Ipv4Addr) -> Result<()> {
        if let Err(e) = self.fault(Fault::AddressDelete) {
            return address_gone_ok(addr, Err(e));
        }
        let before = self.addrs.len();
        self.addrs.retain(|a| !(a.address == addr && a.is_on(ifname)));
        if self.addrs.len() == before {
            warn!("address {} is not on {}", addr, ifname);
        }
        Ok(())
    }

    async fn address_set_prefix(
        &mut self,
        ifname: &str,
        addr: Ipv4Addr,
        prefix: u8,
    ) -> Result<()> {
        self.fault(Fault::AddressPrefix)?;
        let entry = self.address_mut(ifname, addr)?;
        entry.prefix = prefix;
        entry.broadcast = Some(broadcast_for(addr, prefix));
        Ok(())
    }

    async fn address_set_broadcast(
        &mut self,
        ifname: &str,
        addr: Ipv4Addr,
        broadcast: Ipv4Addr,
    ) -> Result<()> {
        self.address_mut(ifname, addr)?.broadcast = Some(broadcast);
        Ok(())
    }

    async fn routes(&mut self) -> Result<Vec<RouteKey>> {
        Ok(self.routes.clone())
    }

    async fn route_replace_or_delete(&mut self, change: &RouteChange) -> Result<()> {
        self.route_log.push(change.clone());
        self.fault(Fault::RouteChange)?;

        let position = |routes: &[RouteKey], key: &RouteKey| {
            routes
                .iter()
                .position(|r| key.matches(r))
                .ok_or_else(|| Error::from_errno(libc::ESRCH).with_context(key.to_string()))
        };

        match change {
            RouteChange::Create(key) => {
                if let Some(dev) = key.dev() {
                    self.link_mut(dev)?;
                }
                let clash = self.routes.iter().any(|r| {
                    r.dst() == key.dst()
                        && r.prefix() == key.prefix()
                        && r.metric().unwrap_or(0) == key.metric().unwrap_or(0)
                });
                if clash {
                    return Err(Error::from_errno(libc::EEXIST).with_context(key.to_string()));
                }
                self.routes.push(key.clone());
            }
            RouteChange::Replace { current, desired } => {
                let i = position(&self.routes, current)?;
                self.routes[i] = desired.clone();
            }
            RouteChange::Delete(key) => {
                let i = position(&self.routes, key)?;
                self.routes.remove(i);
            }
        }
        Ok(())
    }

    async fn neighbors(&mut self) -> Result<Vec<NeighborEntry>> {
        Ok(self.neighbors.clone())
    }

    async fn neighbor_set(&mut self, addr: Ipv4Addr, mac: [u8; 6], permanent: bool) -> Result<()> {
        self.fault(Fault::NeighborSet)?;

        if let Some(entry) = self.neighbors.iter_mut().find(|n| n.address == addr) {
            entry.lladdr = Some(mac);
            entry.permanent = permanent;
            entry.complete = true;
            return Ok(());
        }

        let ifname = self
            .addrs
            .iter()
            .find(|a| ipv4_in_prefix(addr, a.address, a.prefix))
            .map(|a| a.link.clone())
            .ok_or_else(|| Error::from_errno(libc::ENETUNREACH))?;
        self.neighbors.push(NeighborEntry {
            address: addr,
            lladdr: Some(mac),
            ifname,
            permanent,
            complete: true,
        });
        Ok(())
    }

    async fn neighbor_delete(&mut self, addr: Ipv4Addr) -> Result<()> {
        if let Err(e) = self.fault(Fault::NeighborDelete) {
            return neighbor_gone_ok(addr, Err(e));
        }
        let before = self.neighbors.len();
        self.neighbors.retain(|n| n.address != addr);
        if self.neighbors.len() == before {
            warn!("neighbor {} not present", addr);
        }
        Ok(())
    }
}
