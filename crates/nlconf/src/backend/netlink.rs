//! rtnetlink backend.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use tracing::{debug, error, warn};

use super::{
    Backend, LinkInfo, NeighborEntry, NetAddress, RouteChange, address_gone_ok, neighbor_gone_ok,
};
use crate::error::{Error, Result};
use crate::key::{RouteKey, broadcast_for};
use crate::netlink::types::{iff, rt_table, rtn};
use crate::netlink::{Connection, Ipv4Address, Ipv4Route, Neighbor, RouteMetrics};
use crate::util::{base_ifname, ipv4_in_prefix};

/// Backend speaking rtnetlink over one connection.
pub struct NetlinkBackend {
    conn: Connection,
}

impl NetlinkBackend {
    /// Open the rtnetlink connection.
    pub fn new() -> Result<Self> {
        Ok(Self {
            conn: Connection::new()?,
        })
    }

    /// Index of `name`; alias names resolve to their base interface.
    async fn link_index(&self, name: &str) -> Result<u32> {
        let base = base_ifname(name);
        self.conn
            .get_link_by_name(base)
            .await?
            .map(|l| l.index())
            .ok_or_else(|| Error::not_found(format!("interface {}", base)))
    }

    async fn link_names(&self) -> Result<HashMap<u32, String>> {
        Ok(self
            .conn
            .get_links()
            .await?
            .into_iter()
            .filter_map(|l| Some((l.index(), l.name?)))
            .collect())
    }

    async fn find_on(&mut self, ifname: &str, addr: Ipv4Addr) -> Result<Option<NetAddress>> {
        Ok(self
            .addresses()
            .await?
            .into_iter()
            .find(|a| a.address == addr && a.is_on(ifname)))
    }

    async fn to_request(&self, addr: &NetAddress) -> Result<Ipv4Address> {
        let index = self.link_index(&addr.link).await?;
        let mut req = Ipv4Address::new(index, addr.address, addr.prefix);
        if let Some(brd) = addr.broadcast {
            req = req.broadcast(brd);
        }
        if addr.ifname != addr.link {
            req = req.label(addr.ifname.clone());
        }
        Ok(req)
    }

    async fn to_route(&self, key: &RouteKey) -> Result<Ipv4Route> {
        if !key.flags().is_empty() {
            return Err(Error::Unsupported(format!(
                "route flags '{}' need the ioctl backend",
                key.flags()
            )));
        }
        let mut route = Ipv4Route::new(key.dst(), key.prefix());
        if let Some(gw) = key.gateway() {
            route = route.gateway(gw);
        }
        if let Some(dev) = key.dev() {
            route = route.oif(self.link_index(dev).await?);
        }
        if let Some(metric) = key.metric() {
            route = route.priority(metric);
        }
        if key.is_reject() {
            route = route.reject();
        }
        Ok(route.metrics(RouteMetrics {
            mtu: key.mss(),
            window: key.window(),
            rtt: key.irtt(),
        }))
    }
}

impl Backend for NetlinkBackend {
    fn name(&self) -> &'static str {
        "netlink"
    }

    async fn interfaces(&mut self) -> Result<Vec<LinkInfo>> {
        Ok(self
            .conn
            .get_links()
            .await?
            .into_iter()
            .filter_map(|l| {
                Some(LinkInfo {
                    index: l.index(),
                    mtu: l.mtu.unwrap_or(0),
                    flags: l.flags(),
                    address: l.address,
                    name: l.name?,
                })
            })
            .collect())
    }

    async fn vlan_add(&mut self, base: &str, vid: u16) -> Result<()> {
        let parent = self.link_index(base).await?;
        let name = format!("{}.{}", base, vid);
        self.conn
            .add_vlan(&name, parent, vid)
            .await
            .map_err(|e| Error::from(e).with_context(format!("add VLAN {}", name)))
    }

    async fn vlan_delete(&mut self, name: &str) -> Result<()> {
        let index = self.link_index(name).await?;
        self.conn
            .del_link(index)
            .await
            .map_err(|e| Error::from(e).with_context(format!("delete VLAN {}", name)))
    }

    async fn set_link_up(&mut self, name: &str, up: bool) -> Result<()> {
        let index = self.link_index(name).await?;
        let flags = if up { iff::UP } else { 0 };
        self.conn
            .set_link_flags(index, flags, iff::UP)
            .await
            .map_err(|e| Error::from(e).with_context(format!("set {} status", name)))
    }

    async fn set_link_arp(&mut self, name: &str, enabled: bool) -> Result<()> {
        let index = self.link_index(name).await?;
        let flags = if enabled { 0 } else { iff::NOARP };
        self.conn
            .set_link_flags(index, flags, iff::NOARP)
            .await
            .map_err(|e| Error::from(e).with_context(format!("set {} arp", name)))
    }

    async fn set_link_mtu(&mut self, name: &str, mtu: u32) -> Result<()> {
        let index = self.link_index(name).await?;
        self.conn
            .set_link_mtu(index, mtu)
            .await
            .map_err(|e| Error::from(e).with_context(format!("set {} mtu", name)))
    }

    async fn addresses(&mut self) -> Result<Vec<NetAddress>> {
        let names = self.link_names().await?;
        Ok(self
            .conn
            .get_addresses()
            .await?
            .into_iter()
            .filter_map(|a| {
                let link = names.get(&a.index())?.clone();
                Some(NetAddress {
                    ifname: a.label.clone().unwrap_or_else(|| link.clone()),
                    link,
                    address: a.primary()?,
                    prefix: a.prefix_len(),
                    broadcast: a.broadcast,
                })
            })
            .collect())
    }

    async fn address_add(
        &mut self,
        ifname: &str,
        addr: Ipv4Addr,
        prefix: u8,
        broadcast: Option<Ipv4Addr>,
    ) -> Result<()> {
        let link = base_ifname(ifname);
        let req = self
            .to_request(&NetAddress {
                ifname: ifname.to_owned(),
                link: link.to_owned(),
                address: addr,
                prefix,
                broadcast,
            })
            .await?;
        self.conn
            .add_address(&req)
            .await
            .map_err(|e| Error::from(e).with_context(format!("add {} to {}", addr, ifname)))
    }

    async fn address_delete(&mut self, ifname: &str, addr: Ipv4Addr) -> Result<()> {
        let Some(current) = self.find_on(ifname, addr).await? else {
            warn!("address {} is not on {}", addr, ifname);
            return Ok(());
        };
        let req = self.to_request(&current).await?;
        let result = self.conn.del_address(&req).await.map_err(Error::from);
        address_gone_ok(addr, result)
    }

    async fn address_set_prefix(
        &mut self,
        ifname: &str,
        addr: Ipv4Addr,
        prefix: u8,
    ) -> Result<()> {
        let current = self
            .find_on(ifname, addr)
            .await?
            .ok_or_else(|| Error::not_found(format!("address {} on {}", addr, ifname)))?;
        let old = self.to_request(&current).await?;
        let new = self
            .to_request(&NetAddress {
                prefix,
                broadcast: Some(broadcast_for(addr, prefix)),
                ..current
            })
            .await?;

        self.conn.del_address(&old).await?;
        if let Err(e) = self.conn.add_address(&new).await {
            error!("re-adding {}/{} failed: {}", addr, prefix, e);
            if let Err(restore) = self.conn.add_address(&old).await {
                error!("restoring {}/{} failed: {}", addr, old.prefix_len, restore);
            }
            return Err(Error::from(e).with_context(format!("set prefix of {}", addr)));
        }
        Ok(())
    }

    async fn address_set_broadcast(
        &mut self,
        ifname: &str,
        addr: Ipv4Addr,
        broadcast: Ipv4Addr,
    ) -> Result<()> {
        let current = self
            .find_on(ifname, addr)
            .await?
            .ok_or_else(|| Error::not_found(format!("address {} on {}", addr, ifname)))?;
        let req = self
            .to_request(&NetAddress {
                broadcast: Some(broadcast),
                ..current
            })
            .await?;
        self.conn
            .replace_address(&req)
            .await
            .map_err(|e| Error::from(e).with_context(format!("set broadcast of {}", addr)))
    }

    async fn routes(&mut self) -> Result<Vec<RouteKey>> {
        let names = self.link_names().await?;
        let mut keys = Vec::new();

        for route in self.conn.get_routes().await? {
            if route.table_id() != rt_table::MAIN as u32 {
                continue;
            }
            let reject = match route.route_type() {
                rtn::UNICAST => false,
                rtn::UNREACHABLE => true,
                _ => continue,
            };

            let dst = route.destination.unwrap_or(Ipv4Addr::UNSPECIFIED);
            let Ok(mut key) = RouteKey::new(dst, route.dst_len()) else {
                continue;
            };
            key.set_gateway(route.gateway);
            if let Err(e) = key.set_dev(route.oif.and_then(|i| names.get(&i)).map(String::as_str)) {
                debug!("skipping route to {}: {}", key, e);
                continue;
            }
            key.set_metric(route.priority);
            key.set_mss(route.mtu);
            key.set_window(route.window);
            key.set_irtt(route.rtt);
            key.set_reject(reject);
            keys.push(key);
        }

        Ok(keys)
    }

    async fn route_replace_or_delete(&mut self, change: &RouteChange) -> Result<()> {
        match change {
            RouteChange::Create(key) => {
                let route = self.to_route(key).await?;
                self.conn
                    .add_route(&route)
                    .await
                    .map_err(|e| Error::from(e).with_context(format!("add route {}", key)))
            }
            RouteChange::Replace { current, desired } => {
                let new = self.to_route(desired).await?;
                // The kernel keys routes on priority, so a metric change
                // cannot be done in place.
                if current.metric() == desired.metric() {
                    return self.conn.replace_route(&new).await.map_err(|e| {
                        Error::from(e).with_context(format!("replace route {}", current))
                    });
                }

                let old = self.to_route(current).await?;
                self.conn
                    .del_route(&old)
                    .await
                    .map_err(|e| Error::from(e).with_context(format!("delete route {}", current)))?;
                if let Err(e) = self.conn.add_route(&new).await {
                    error!("re-adding route {} failed: {}", desired, e);
                    if let Err(restore) = self.conn.add_route(&old).await {
                        error!("restoring route {} failed: {}", current, restore);
                    }
                    return Err(Error::from(e).with_context(format!("add route {}", desired)));
                }
                Ok(())
            }
            RouteChange::Delete(key) => {
                let route = self.to_route(key).await?;
                self.conn
                    .del_route(&route)
                    .await
                    .map_err(|e| Error::from(e).with_context(format!("delete route {}", key)))
            }
        }
    }

    async fn neighbors(&mut self) -> Result<Vec<NeighborEntry>> {
        let names = self.link_names().await?;
        Ok(self
            .conn
            .get_neighbors()
            .await?
            .into_iter()
            .filter_map(|n| {
                Some(NeighborEntry {
                    address: n.destination?,
                    lladdr: n.lladdr,
                    ifname: names.get(&n.ifindex()).cloned().unwrap_or_default(),
                    permanent: n.is_permanent(),
                    complete: n.is_complete(),
                })
            })
            .collect())
    }

    async fn neighbor_set(&mut self, addr: Ipv4Addr, mac: [u8; 6], permanent: bool) -> Result<()> {
        let existing = self
            .conn
            .get_neighbors()
            .await?
            .into_iter()
            .find(|n| n.destination == Some(addr))
            .map(|n| n.ifindex());

        let ifindex = match existing {
            Some(index) => index,
            None => {
                let link = self
                    .addresses()
                    .await?
                    .into_iter()
                    .find(|a| ipv4_in_prefix(addr, a.address, a.prefix))
                    .map(|a| a.link)
                    .ok_or_else(|| {
                        Error::from_errno(libc::ENETUNREACH)
                            .with_context(format!("no interface reaches {}", addr))
                    })?;
                self.link_index(&link).await?
            }
        };

        let mut neigh = Neighbor::new(ifindex, addr).lladdr(mac);
        if permanent {
            neigh = neigh.permanent();
        }
        self.conn
            .replace_neighbor(&neigh)
            .await
            .map_err(|e| Error::from(e).with_context(format!("set neighbor {}", addr)))
    }

    async fn neighbor_delete(&mut self, addr: Ipv4Addr) -> Result<()> {
        let entries: Vec<u32> = self
            .conn
            .get_neighbors()
            .await?
            .into_iter()
            .filter(|n| n.destination == Some(addr))
            .map(|n| n.ifindex())
            .collect();

        if entries.is_empty() {
            warn!("neighbor {} not present", addr);
            return Ok(());
        }

        for ifindex in entries {
            let result = match self.conn.del_neighbor(&Neighbor::new(ifindex, addr)).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other.map_err(Error::from),
            };
            neighbor_gone_ok(addr, result)?;
        }
        Ok(())
    }
}
