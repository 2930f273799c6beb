//! `interface` and its link-level leaves.

use tracing::warn;

use super::{flag, parse_flag};
use crate::backend::{Backend, parse_vlan_name};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::tree::agent::Agent;
use crate::util::format_mac;

impl<B: Backend, H: Host> Agent<B, H> {
    /// Create VLAN interface `base.vid`.
    pub(crate) async fn vlan_add(&mut self, name: &str) -> Result<()> {
        if self.backend.interface_exists(name).await? {
            return Err(Error::exists(format!("interface {}", name)));
        }
        let (base, vid) = parse_vlan_name(name)?;
        if !self.backend.interface_exists(base).await? {
            return Err(Error::InvalidValue(format!(
                "base interface {} of {} does not exist",
                base, name
            )));
        }
        self.backend.vlan_add(base, vid).await
    }

    /// Delete VLAN interface `base.vid`. A VLAN that is already gone counts
    /// as deleted.
    pub(crate) async fn vlan_del(&mut self, name: &str) -> Result<()> {
        parse_vlan_name(name)?;
        if !self.backend.interface_exists(name).await? {
            warn!("VLAN {} already gone", name);
            return Ok(());
        }
        self.backend.vlan_delete(name).await
    }

    pub(crate) async fn interface_index_get(&mut self, ifname: &str) -> Result<String> {
        let link = self.backend.interface(ifname).await?;
        if link.index == 0 {
            return Err(Error::not_found(format!("index of {}", ifname)));
        }
        Ok(link.index.to_string())
    }

    pub(crate) async fn link_addr_get(&mut self, ifname: &str) -> Result<String> {
        let link = self.backend.interface(ifname).await?;
        Ok(format_mac(&link.address.unwrap_or_default()))
    }

    pub(crate) async fn interface_arp_get(&mut self, ifname: &str) -> Result<String> {
        Ok(flag(self.backend.interface(ifname).await?.arp_enabled()))
    }

    pub(crate) async fn interface_arp_set(&mut self, ifname: &str, value: &str) -> Result<()> {
        let enabled = parse_flag(value)?;
        self.backend.interface(ifname).await?;
        self.backend.set_link_arp(ifname, enabled).await
    }

    pub(crate) async fn mtu_get(&mut self, ifname: &str) -> Result<String> {
        Ok(self.backend.interface(ifname).await?.mtu.to_string())
    }

    pub(crate) async fn mtu_set(&mut self, ifname: &str, value: &str) -> Result<()> {
        let mtu: u32 = value
            .parse()
            .map_err(|_| Error::InvalidValue(format!("invalid MTU: {:?}", value)))?;
        self.backend.interface(ifname).await?;
        self.backend.set_link_mtu(ifname, mtu).await
    }

    pub(crate) async fn status_get(&mut self, ifname: &str) -> Result<String> {
        Ok(flag(self.backend.interface(ifname).await?.is_up()))
    }

    pub(crate) async fn status_set(&mut self, ifname: &str, value: &str) -> Result<()> {
        let up = parse_flag(value)?;
        self.backend.interface(ifname).await?;
        self.backend.set_link_up(ifname, up).await
    }
}
