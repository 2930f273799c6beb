//! IPv4 neighbor (ARP) management.

use std::net::Ipv4Addr;

use super::builder::MessageBuilder;
use super::connection::{Connection, ack_request, replace_request};
use super::error::Result;
use super::message::rtm;
use super::types::{NdMsg, nda, nud};

/// An IPv4 neighbor entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub ifindex: u32,
    pub destination: Ipv4Addr,
    pub lladdr: Option<[u8; 6]>,
    pub permanent: bool,
}

impl Neighbor {
    /// Create an entry for `destination` on the given interface.
    pub fn new(ifindex: u32, destination: Ipv4Addr) -> Self {
        Self {
            ifindex,
            destination,
            lladdr: None,
            permanent: false,
        }
    }

    /// Set the link-layer address.
    pub fn lladdr(mut self, lladdr: [u8; 6]) -> Self {
        self.lladdr = Some(lladdr);
        self
    }

    /// Make the entry static.
    pub fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }

    fn state(&self) -> u16 {
        if self.permanent {
            nud::PERMANENT
        } else {
            nud::REACHABLE
        }
    }

    /// Build a create-or-replace request for this entry.
    pub fn build(&self) -> MessageBuilder {
        let mut builder = replace_request(rtm::NEWNEIGH);
        builder.append(&NdMsg::ipv4(self.ifindex, self.state()));
        builder.append_attr_ipv4(nda::DST, self.destination);
        if let Some(mac) = self.lladdr {
            builder.append_attr(nda::LLADDR, &mac);
        }
        builder
    }

    /// Build the request deleting this entry.
    pub fn build_delete(&self) -> MessageBuilder {
        let mut builder = ack_request(rtm::DELNEIGH);
        builder.append(&NdMsg::ipv4(self.ifindex, 0));
        builder.append_attr_ipv4(nda::DST, self.destination);
        builder
    }
}

impl Connection {
    /// Add or replace a neighbor entry.
    pub async fn replace_neighbor(&self, neighbor: &Neighbor) -> Result<()> {
        self.request_ack(neighbor.build()).await
    }

    /// Delete a neighbor entry.
    pub async fn del_neighbor(&self, neighbor: &Neighbor) -> Result<()> {
        self.request_ack(neighbor.build_delete()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::message::NLMSG_HDRLEN;
    use zerocopy::FromBytes;

    #[test]
    fn test_state_follows_permanence() {
        let neigh = Neighbor::new(2, Ipv4Addr::new(10, 0, 0, 9)).lladdr([2, 0, 0, 0, 0, 1]);
        let msg = neigh.build().finish();
        let (ndm, _) = NdMsg::read_from_prefix(&msg[NLMSG_HDRLEN..]).unwrap();
        assert_eq!(ndm.ndm_state, nud::REACHABLE);

        let msg = neigh.permanent().build().finish();
        let (ndm, _) = NdMsg::read_from_prefix(&msg[NLMSG_HDRLEN..]).unwrap();
        assert_eq!(ndm.ndm_state, nud::PERMANENT);
        assert_eq!(ndm.ndm_ifindex, 2);
    }
}
