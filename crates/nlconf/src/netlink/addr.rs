//! IPv4 address management.

use std::net::Ipv4Addr;

use super::builder::MessageBuilder;
use super::connection::{Connection, ack_request, create_request, replace_request};
use super::error::Result;
use super::message::rtm;
use super::types::{IfAddrMsg, ifa};

/// An IPv4 address on one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Address {
    pub index: u32,
    pub address: Ipv4Addr,
    pub prefix_len: u8,
    pub broadcast: Option<Ipv4Addr>,
    pub label: Option<String>,
}

impl Ipv4Address {
    /// Create an address on the interface with the given index.
    pub fn new(index: u32, address: Ipv4Addr, prefix_len: u8) -> Self {
        Self {
            index,
            address,
            prefix_len,
            broadcast: None,
            label: None,
        }
    }

    /// Set the broadcast address.
    pub fn broadcast(mut self, broadcast: Ipv4Addr) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    /// Set the address label (an alias name such as `eth0:1`).
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn write_to(&self, builder: &mut MessageBuilder) {
        builder.append(&IfAddrMsg::ipv4(self.index, self.prefix_len));
        builder.append_attr_ipv4(ifa::LOCAL, self.address);
        builder.append_attr_ipv4(ifa::ADDRESS, self.address);
        if let Some(brd) = self.broadcast {
            builder.append_attr_ipv4(ifa::BROADCAST, brd);
        }
        if let Some(ref label) = self.label {
            builder.append_attr_str(ifa::LABEL, label);
        }
    }

    /// Build the request adding this address.
    pub fn build(&self) -> MessageBuilder {
        let mut builder = create_request(rtm::NEWADDR);
        self.write_to(&mut builder);
        builder
    }

    /// Build the request replacing the attributes of an existing address.
    pub fn build_replace(&self) -> MessageBuilder {
        let mut builder = replace_request(rtm::NEWADDR);
        self.write_to(&mut builder);
        builder
    }

    /// Build the request deleting this address.
    pub fn build_delete(&self) -> MessageBuilder {
        let mut builder = ack_request(rtm::DELADDR);
        builder.append(&IfAddrMsg::ipv4(self.index, self.prefix_len));
        builder.append_attr_ipv4(ifa::LOCAL, self.address);
        builder
    }
}

impl Connection {
    /// Add an IPv4 address.
    pub async fn add_address(&self, address: &Ipv4Address) -> Result<()> {
        self.request_ack(address.build()).await
    }

    /// Replace an IPv4 address (used to change the broadcast address).
    pub async fn replace_address(&self, address: &Ipv4Address) -> Result<()> {
        self.request_ack(address.build_replace()).await
    }

    /// Delete an IPv4 address.
    pub async fn del_address(&self, address: &Ipv4Address) -> Result<()> {
        self.request_ack(address.build_delete()).await
    }
}
