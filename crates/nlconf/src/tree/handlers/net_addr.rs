//! `interface/net_addr` and its `prefix` and `broadcast` leaves.
//!
//! The instance name is the dotted address, the value is the prefix length.
//! The `prefix` leaf reads the same value; writing it takes the length as
//! given, with no classful default.

use std::net::Ipv4Addr;

use crate::backend::{Backend, NetAddress, Tokens};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::key::{broadcast_for, classful_prefix, decode_ipv4, parse_prefix_value, validate_unicast};
use crate::tree::agent::Agent;
use crate::util::base_ifname;

/// Prefix from an object value; empty or 0 selects the classful default.
fn prefix_or_classful(addr: Ipv4Addr, value: &str) -> Result<u8> {
    match parse_prefix_value(value)? {
        0 => Ok(classful_prefix(addr)),
        prefix => Ok(prefix),
    }
}

impl<B: Backend, H: Host> Agent<B, H> {
    async fn net_addr_find(&mut self, ifname: &str, addr: &str) -> Result<NetAddress> {
        let addr = decode_ipv4(addr)?;
        self.backend
            .addresses()
            .await?
            .into_iter()
            .find(|a| a.address == addr && a.is_on(ifname))
            .ok_or_else(|| Error::not_found(format!("address {} on {}", addr, ifname)))
    }

    pub(crate) async fn net_addr_get(&mut self, ifname: &str, addr: &str) -> Result<String> {
        Ok(self.net_addr_find(ifname, addr).await?.prefix.to_string())
    }

    pub(crate) async fn net_addr_set(&mut self, ifname: &str, addr: &str, value: &str) -> Result<()> {
        let found = self.net_addr_find(ifname, addr).await?;
        let prefix = prefix_or_classful(found.address, value)?;
        self.backend
            .address_set_prefix(&found.ifname, found.address, prefix)
            .await
    }

    pub(crate) async fn prefix_set(&mut self, ifname: &str, addr: &str, value: &str) -> Result<()> {
        let found = self.net_addr_find(ifname, addr).await?;
        if value.is_empty() {
            return Err(Error::InvalidFormat("empty prefix length".into()));
        }
        let prefix = parse_prefix_value(value)?;
        self.backend
            .address_set_prefix(&found.ifname, found.address, prefix)
            .await
    }

    pub(crate) async fn net_addr_add(&mut self, ifname: &str, addr: &str, value: &str) -> Result<()> {
        let addr = decode_ipv4(addr)?;
        validate_unicast(addr)?;
        let prefix = prefix_or_classful(addr, value)?;
        self.backend.interface(base_ifname(ifname)).await?;

        if let Some(existing) = self.backend.find_address(addr).await? {
            return Err(Error::exists(format!(
                "address {} on {}",
                addr, existing.ifname
            )));
        }
        self.backend
            .address_add(ifname, addr, prefix, Some(broadcast_for(addr, prefix)))
            .await
    }

    pub(crate) async fn net_addr_del(&mut self, ifname: &str, addr: &str) -> Result<()> {
        let found = self.net_addr_find(ifname, addr).await?;
        self.backend.address_delete(&found.ifname, found.address).await
    }

    pub(crate) async fn net_addr_list(&mut self, ifname: &str) -> Result<Tokens> {
        self.backend.interface(base_ifname(ifname)).await?;
        self.backend.list_addresses(ifname).await
    }

    pub(crate) async fn broadcast_get(&mut self, ifname: &str, addr: &str) -> Result<String> {
        let found = self.net_addr_find(ifname, addr).await?;
        Ok(found
            .broadcast
            .unwrap_or(Ipv4Addr::UNSPECIFIED)
            .to_string())
    }

    pub(crate) async fn broadcast_set(&mut self, ifname: &str, addr: &str, value: &str) -> Result<()> {
        let broadcast = decode_ipv4(value)?;
        if broadcast.is_unspecified() || broadcast.is_multicast() {
            return Err(Error::InvalidValue(format!(
                "{} is not a broadcast address",
                broadcast
            )));
        }
        let found = self.net_addr_find(ifname, addr).await?;
        self.backend
            .address_set_broadcast(&found.ifname, found.address, broadcast)
            .await
    }
}
