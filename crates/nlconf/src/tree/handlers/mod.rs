//! Object handlers.
//!
//! Each submodule adds the handlers of one object family to [`Agent`].
//! The `dispatch_*` methods below route a verb to the handler of the
//! resolved node.

mod arp;
mod env;
mod interface;
mod net_addr;
mod route;
mod system;
mod user;

use super::agent::Agent;
use super::oid::Oid;
use super::registry::Object;
use crate::backend::{Backend, Tokens};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::staging::GroupId;

use route::RouteAttr;

/// Parse a "0"/"1" flag value.
fn parse_flag(value: &str) -> Result<bool> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(Error::InvalidValue(format!("expected 0 or 1, got {:?}", other))),
    }
}

fn flag(on: bool) -> String {
    if on { "1" } else { "0" }.to_owned()
}

fn unsupported(verb: &str, object: Object) -> Error {
    Error::Unsupported(format!("{} on {:?}", verb, object))
}

impl<B: Backend, H: Host> Agent<B, H> {
    pub(crate) async fn dispatch_get(&mut self, object: Object, oid: &Oid) -> Result<String> {
        let first = oid.instance(0).unwrap_or_default();
        let second = oid.instance(1).unwrap_or_default();
        match object {
            Object::InterfaceIndex => self.interface_index_get(first).await,
            Object::LinkAddr => self.link_addr_get(first).await,
            Object::InterfaceArp => self.interface_arp_get(first).await,
            Object::Mtu => self.mtu_get(first).await,
            Object::Status => self.status_get(first).await,
            Object::NetAddr | Object::Prefix => self.net_addr_get(first, second).await,
            Object::Broadcast => self.broadcast_get(first, second).await,
            Object::Dns => self.dns_get().await,
            Object::Arp => self.arp_get(oid.leaf(), false).await,
            Object::VolatileArp => self.arp_get(oid.leaf(), true).await,
            Object::Route => self.route_get(first).await,
            Object::RouteMetric => self.route_attr_get(first, RouteAttr::Metric).await,
            Object::RouteMtu => self.route_attr_get(first, RouteAttr::Mtu).await,
            Object::RouteWin => self.route_attr_get(first, RouteAttr::Win).await,
            Object::RouteIrtt => self.route_attr_get(first, RouteAttr::Irtt).await,
            Object::Env => self.env_get(first),
            Object::Ip4Fw => self.ip4_fw_get().await,
            other => Err(unsupported("get", other)),
        }
    }

    pub(crate) async fn dispatch_set(
        &mut self,
        group: GroupId,
        object: Object,
        oid: &Oid,
        value: &str,
    ) -> Result<()> {
        let first = oid.instance(0).unwrap_or_default();
        let second = oid.instance(1).unwrap_or_default();
        match object {
            Object::InterfaceArp => self.interface_arp_set(first, value).await,
            Object::Mtu => self.mtu_set(first, value).await,
            Object::Status => self.status_set(first, value).await,
            Object::NetAddr => self.net_addr_set(first, second, value).await,
            Object::Prefix => self.prefix_set(first, second, value).await,
            Object::Broadcast => self.broadcast_set(first, second, value).await,
            Object::Arp => self.arp_set(oid.leaf(), value, false).await,
            Object::VolatileArp => self.arp_set(oid.leaf(), value, true).await,
            Object::Route => self.route_set(group, first, value).await,
            Object::RouteMetric => self.route_attr_set(group, first, RouteAttr::Metric, value).await,
            Object::RouteMtu => self.route_attr_set(group, first, RouteAttr::Mtu, value).await,
            Object::RouteWin => self.route_attr_set(group, first, RouteAttr::Win, value).await,
            Object::RouteIrtt => self.route_attr_set(group, first, RouteAttr::Irtt, value).await,
            Object::Env => self.env_set(first, value),
            Object::Ip4Fw => self.ip4_fw_set(value).await,
            other => Err(unsupported("set", other)),
        }
    }

    pub(crate) async fn dispatch_add(
        &mut self,
        group: GroupId,
        object: Object,
        oid: &Oid,
        value: &str,
    ) -> Result<()> {
        let first = oid.instance(0).unwrap_or_default();
        let second = oid.instance(1).unwrap_or_default();
        match object {
            Object::Interface => self.vlan_add(first).await,
            Object::NetAddr => self.net_addr_add(first, second, value).await,
            Object::Arp => self.arp_add(oid.leaf(), value, false).await,
            Object::VolatileArp => self.arp_add(oid.leaf(), value, true).await,
            Object::Route => self.route_add(group, first, value),
            Object::Env => self.env_add(first, value),
            Object::User => self.user_add(first).await,
            other => Err(unsupported("add", other)),
        }
    }

    pub(crate) async fn dispatch_del(
        &mut self,
        group: GroupId,
        object: Object,
        oid: &Oid,
    ) -> Result<()> {
        let first = oid.instance(0).unwrap_or_default();
        let second = oid.instance(1).unwrap_or_default();
        match object {
            Object::Interface => self.vlan_del(first).await,
            Object::NetAddr => self.net_addr_del(first, second).await,
            Object::Arp => self.arp_del(oid.leaf(), false).await,
            Object::VolatileArp => self.arp_del(oid.leaf(), true).await,
            Object::Route => self.route_del(group, first).await,
            Object::Env => self.env_del(first),
            Object::User => self.user_del(first).await,
            other => Err(unsupported("del", other)),
        }
    }

    pub(crate) async fn dispatch_list(&mut self, object: Object, oid: &Oid) -> Result<Tokens> {
        let first = oid.instance(0).unwrap_or_default();
        match object {
            Object::Interface => self.backend.list_interfaces().await,
            Object::NetAddr => self.net_addr_list(first).await,
            Object::Arp => self.backend.list_neighbors(false).await,
            Object::VolatileArp => self.backend.list_neighbors(true).await,
            Object::Route => self.backend.list_routes().await,
            Object::Env => Ok(self.env_list()),
            Object::User => self.user_list().await,
            other => Err(unsupported("list", other)),
        }
    }
}
