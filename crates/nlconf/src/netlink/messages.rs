//! Strongly-typed dump replies for links, addresses, routes and neighbors.
//!
//! Only the attributes the configuration tree reads are kept; everything
//! else in the reply is skipped.

use std::net::Ipv4Addr;

use zerocopy::IntoBytes;

use super::attr::{AttrIter, get};
use super::parse::{FromNetlink, PResult, parse_attr, parse_header};
use super::types::{
    AF_INET, IfAddrMsg, IfInfoMsg, NdMsg, RtMsg, ifa, ifla, iff, nda, nud, rta, rtax,
};

fn ipv4(data: &[u8]) -> Option<Ipv4Addr> {
    if data.len() == 4 {
        get::ipv4(data).ok()
    } else {
        None
    }
}

/// RTM_NEWLINK reply.
#[derive(Debug, Clone, Default)]
pub struct LinkMessage {
    pub header: IfInfoMsg,
    pub name: Option<String>,
    pub mtu: Option<u32>,
    pub address: Option<[u8; 6]>,
}

impl LinkMessage {
    /// Interface index.
    pub fn index(&self) -> u32 {
        self.header.ifi_index as u32
    }

    /// Interface flags (IFF_*).
    pub fn flags(&self) -> u32 {
        self.header.ifi_flags
    }

    /// Check if the interface is administratively up.
    pub fn is_up(&self) -> bool {
        self.header.ifi_flags & iff::UP != 0
    }
}

impl FromNetlink for LinkMessage {
    fn write_dump_header(buf: &mut Vec<u8>) {
        buf.extend_from_slice(IfInfoMsg::default().as_bytes());
    }

    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let mut msg = LinkMessage {
            header: parse_header(input)?,
            ..Default::default()
        };

        while let Some((kind, data)) = parse_attr(input)? {
            match kind {
                ifla::IFNAME => msg.name = get::string(data).ok().map(str::to_owned),
                ifla::MTU => msg.mtu = get::u32_ne(data).ok(),
                ifla::ADDRESS => msg.address = get::mac(data),
                _ => {}
            }
        }

        Ok(msg)
    }
}

/// RTM_NEWADDR reply (IPv4 only).
#[derive(Debug, Clone, Default)]
pub struct AddressMessage {
    pub header: IfAddrMsg,
    pub address: Option<Ipv4Addr>,
    pub local: Option<Ipv4Addr>,
    pub broadcast: Option<Ipv4Addr>,
    pub label: Option<String>,
}

impl AddressMessage {
    /// Interface index.
    pub fn index(&self) -> u32 {
        self.header.ifa_index
    }

    /// Prefix length.
    pub fn prefix_len(&self) -> u8 {
        self.header.ifa_prefixlen
    }

    /// The interface's own address: IFA_LOCAL, falling back to IFA_ADDRESS.
    pub fn primary(&self) -> Option<Ipv4Addr> {
        self.local.or(self.address)
    }

    /// Check if this is an IPv4 address.
    pub fn is_ipv4(&self) -> bool {
        self.header.ifa_family == AF_INET
    }
}

impl FromNetlink for AddressMessage {
    fn write_dump_header(buf: &mut Vec<u8>) {
        buf.extend_from_slice(IfAddrMsg::ipv4(0, 0).as_bytes());
    }

    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let mut msg = AddressMessage {
            header: parse_header(input)?,
            ..Default::default()
        };

        while let Some((kind, data)) = parse_attr(input)? {
            match kind {
                ifa::ADDRESS => msg.address = ipv4(data),
                ifa::LOCAL => msg.local = ipv4(data),
                ifa::BROADCAST => msg.broadcast = ipv4(data),
                ifa::LABEL => msg.label = get::string(data).ok().map(str::to_owned),
                _ => {}
            }
        }

        Ok(msg)
    }
}

/// RTM_NEWROUTE reply (IPv4 only).
#[derive(Debug, Clone, Default)]
pub struct RouteMessage {
    pub header: RtMsg,
    pub destination: Option<Ipv4Addr>,
    pub gateway: Option<Ipv4Addr>,
    pub oif: Option<u32>,
    pub priority: Option<u32>,
    pub table: Option<u32>,
    pub mtu: Option<u32>,
    pub window: Option<u32>,
    pub rtt: Option<u32>,
}

impl RouteMessage {
    /// Check if this is an IPv4 route.
    pub fn is_ipv4(&self) -> bool {
        self.header.rtm_family == AF_INET
    }

    /// Destination prefix length.
    pub fn dst_len(&self) -> u8 {
        self.header.rtm_dst_len
    }

    /// Routing table, preferring the 32-bit RTA_TABLE attribute.
    pub fn table_id(&self) -> u32 {
        self.table.unwrap_or(self.header.rtm_table as u32)
    }

    /// Route type (RTN_*).
    pub fn route_type(&self) -> u8 {
        self.header.rtm_type
    }
}

impl FromNetlink for RouteMessage {
    fn write_dump_header(buf: &mut Vec<u8>) {
        let header = RtMsg {
            rtm_family: AF_INET,
            ..Default::default()
        };
        buf.extend_from_slice(header.as_bytes());
    }

    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let mut msg = RouteMessage {
            header: parse_header(input)?,
            ..Default::default()
        };

        while let Some((kind, data)) = parse_attr(input)? {
            match kind {
                rta::DST => msg.destination = ipv4(data),
                rta::GATEWAY => msg.gateway = ipv4(data),
                rta::OIF => msg.oif = get::u32_ne(data).ok(),
                rta::PRIORITY => msg.priority = get::u32_ne(data).ok(),
                rta::TABLE => msg.table = get::u32_ne(data).ok(),
                rta::METRICS => {
                    for (metric, value) in AttrIter::new(data) {
                        let value = get::u32_ne(value).ok();
                        match metric {
                            rtax::MTU => msg.mtu = value,
                            rtax::WINDOW => msg.window = value,
                            rtax::RTT => msg.rtt = value,
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(msg)
    }
}

/// RTM_NEWNEIGH reply (IPv4 only).
#[derive(Debug, Clone, Default)]
pub struct NeighborMessage {
    pub header: NdMsg,
    pub destination: Option<Ipv4Addr>,
    pub lladdr: Option<[u8; 6]>,
}

impl NeighborMessage {
    /// Interface index.
    pub fn ifindex(&self) -> u32 {
        self.header.ndm_ifindex as u32
    }

    /// NUD state bits.
    pub fn state(&self) -> u16 {
        self.header.ndm_state
    }

    /// Check if the entry is static.
    pub fn is_permanent(&self) -> bool {
        self.header.ndm_state & nud::PERMANENT != 0
    }

    /// Check if the entry carries a resolved link-layer address.
    pub fn is_complete(&self) -> bool {
        self.lladdr.is_some() && self.header.ndm_state & nud::VALID != 0
    }
}

impl FromNetlink for NeighborMessage {
    fn write_dump_header(buf: &mut Vec<u8>) {
        buf.extend_from_slice(NdMsg::ipv4(0, 0).as_bytes());
    }

    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let mut msg = NeighborMessage {
            header: parse_header(input)?,
            ..Default::default()
        };

        while let Some((kind, data)) = parse_attr(input)? {
            match kind {
                nda::DST => msg.destination = ipv4(data),
                nda::LLADDR => msg.lladdr = get::mac(data),
                _ => {}
            }
        }

        Ok(msg)
    }
}
