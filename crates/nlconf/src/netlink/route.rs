//! IPv4 main-table route management.

use std::net::Ipv4Addr;

use super::builder::MessageBuilder;
use super::connection::{Connection, ack_request, create_request, replace_request};
use super::error::Result;
use super::message::rtm;
use super::types::{RtMsg, rt_scope, rta, rtax, rtn};

/// Route metrics written into RTA_METRICS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMetrics {
    /// Path MTU (RTAX_MTU)
    pub mtu: Option<u32>,
    /// Window clamp (RTAX_WINDOW)
    pub window: Option<u32>,
    /// Initial round-trip time (RTAX_RTT)
    pub rtt: Option<u32>,
}

impl RouteMetrics {
    fn has_any(&self) -> bool {
        self.mtu.is_some() || self.window.is_some() || self.rtt.is_some()
    }

    fn write_to(&self, builder: &mut MessageBuilder) {
        let nest = builder.nest_start(rta::METRICS);
        if let Some(mtu) = self.mtu {
            builder.append_attr_u32(rtax::MTU, mtu);
        }
        if let Some(window) = self.window {
            builder.append_attr_u32(rtax::WINDOW, window);
        }
        if let Some(rtt) = self.rtt {
            builder.append_attr_u32(rtax::RTT, rtt);
        }
        builder.nest_end(nest);
    }
}

/// An IPv4 route in the main table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Route {
    pub destination: Ipv4Addr,
    pub prefix_len: u8,
    pub gateway: Option<Ipv4Addr>,
    pub oif: Option<u32>,
    pub priority: Option<u32>,
    pub metrics: RouteMetrics,
    pub reject: bool,
}

impl Default for Ipv4Route {
    fn default() -> Self {
        Self {
            destination: Ipv4Addr::UNSPECIFIED,
            prefix_len: 0,
            gateway: None,
            oif: None,
            priority: None,
            metrics: RouteMetrics::default(),
            reject: false,
        }
    }
}

impl Ipv4Route {
    /// Create a route to `destination/prefix_len`.
    pub fn new(destination: Ipv4Addr, prefix_len: u8) -> Self {
        Self {
            destination,
            prefix_len,
            ..Default::default()
        }
    }

    /// Set the next hop.
    pub fn gateway(mut self, gateway: Ipv4Addr) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Set the output interface index.
    pub fn oif(mut self, index: u32) -> Self {
        self.oif = Some(index);
        self
    }

    /// Set the route priority (metric).
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the route metrics.
    pub fn metrics(mut self, metrics: RouteMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Mark the route as unreachable.
    pub fn reject(mut self) -> Self {
        self.reject = true;
        self
    }

    fn header(&self) -> RtMsg {
        let mut rtm = RtMsg::ipv4_main(self.prefix_len);
        if self.reject {
            rtm.rtm_type = rtn::UNREACHABLE;
        } else if self.gateway.is_none() {
            rtm.rtm_scope = rt_scope::LINK;
        }
        rtm
    }

    fn write_key(&self, builder: &mut MessageBuilder) {
        if self.prefix_len > 0 {
            builder.append_attr_ipv4(rta::DST, self.destination);
        }
        if let Some(gw) = self.gateway {
            builder.append_attr_ipv4(rta::GATEWAY, gw);
        }
        if let Some(oif) = self.oif {
            builder.append_attr_u32(rta::OIF, oif);
        }
        if let Some(prio) = self.priority {
            builder.append_attr_u32(rta::PRIORITY, prio);
        }
    }

    /// Build an RTM_NEWROUTE request into `builder`.
    fn build_into(&self, mut builder: MessageBuilder) -> MessageBuilder {
        builder.append(&self.header());
        self.write_key(&mut builder);
        if self.metrics.has_any() {
            self.metrics.write_to(&mut builder);
        }
        builder
    }

    /// Build the request adding this route; fails in the kernel if it exists.
    pub fn build(&self) -> MessageBuilder {
        self.build_into(create_request(rtm::NEWROUTE))
    }

    /// Build the request replacing the route with the same key.
    pub fn build_replace(&self) -> MessageBuilder {
        self.build_into(replace_request(rtm::NEWROUTE))
    }

    /// Build the request deleting this route.
    pub fn build_delete(&self) -> MessageBuilder {
        let mut builder = ack_request(rtm::DELROUTE);
        let mut rtm = self.header();
        rtm.rtm_scope = rt_scope::NOWHERE;
        builder.append(&rtm);
        self.write_key(&mut builder);
        builder
    }
}

impl Connection {
    /// Add a route.
    pub async fn add_route(&self, route: &Ipv4Route) -> Result<()> {
        self.request_ack(route.build()).await
    }

    /// Replace a route in place. The kernel matches on destination and
    /// priority, so callers changing the priority must delete and re-add.
    pub async fn replace_route(&self, route: &Ipv4Route) -> Result<()> {
        self.request_ack(route.build_replace()).await
    }

    /// Delete a route.
    pub async fn del_route(&self, route: &Ipv4Route) -> Result<()> {
        self.request_ack(route.build_delete()).await
    }
}
