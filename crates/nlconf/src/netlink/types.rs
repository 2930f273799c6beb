//! Fixed kernel headers and attribute constants for the rtnetlink families
//! the agent touches: links, IPv4 addresses, IPv4 routes and neighbors.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// AF_INET as carried in the family byte.
pub const AF_INET: u8 = libc::AF_INET as u8;

/// Interface info message (struct ifinfomsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IfInfoMsg {
    pub ifi_family: u8,
    pub __ifi_pad: u8,
    pub ifi_type: u16,
    pub ifi_index: i32,
    pub ifi_flags: u32,
    pub ifi_change: u32,
}

impl IfInfoMsg {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Header addressing one interface.
    pub fn for_index(index: u32) -> Self {
        Self {
            ifi_index: index as i32,
            ..Default::default()
        }
    }

    /// Set `flags` within `change`, leaving the other bits untouched.
    pub fn with_flags(mut self, flags: u32, change: u32) -> Self {
        self.ifi_flags = flags;
        self.ifi_change = change;
        self
    }
}

/// Interface address message (struct ifaddrmsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IfAddrMsg {
    pub ifa_family: u8,
    pub ifa_prefixlen: u8,
    pub ifa_flags: u8,
    pub ifa_scope: u8,
    pub ifa_index: u32,
}

impl IfAddrMsg {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// IPv4 header for one address on one interface.
    pub fn ipv4(index: u32, prefix: u8) -> Self {
        Self {
            ifa_family: AF_INET,
            ifa_prefixlen: prefix,
            ifa_index: index,
            ..Default::default()
        }
    }
}

/// Route message (struct rtmsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RtMsg {
    pub rtm_family: u8,
    pub rtm_dst_len: u8,
    pub rtm_src_len: u8,
    pub rtm_tos: u8,
    pub rtm_table: u8,
    pub rtm_protocol: u8,
    pub rtm_scope: u8,
    pub rtm_type: u8,
    pub rtm_flags: u32,
}

impl RtMsg {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// IPv4 main-table header used for every route the agent writes.
    pub fn ipv4_main(dst_len: u8) -> Self {
        Self {
            rtm_family: AF_INET,
            rtm_dst_len: dst_len,
            rtm_table: rt_table::MAIN,
            rtm_protocol: rtprot::BOOT,
            rtm_scope: rt_scope::UNIVERSE,
            rtm_type: rtn::UNICAST,
            ..Default::default()
        }
    }
}

/// Neighbor discovery message (struct ndmsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NdMsg {
    pub ndm_family: u8,
    pub ndm_pad1: u8,
    pub ndm_pad2: u16,
    pub ndm_ifindex: i32,
    pub ndm_state: u16,
    pub ndm_flags: u8,
    pub ndm_type: u8,
}

impl NdMsg {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// IPv4 neighbor header on one interface.
    pub fn ipv4(ifindex: u32, state: u16) -> Self {
        Self {
            ndm_family: AF_INET,
            ndm_ifindex: ifindex as i32,
            ndm_state: state,
            ..Default::default()
        }
    }
}

/// Link attributes (IFLA_*).
pub mod ifla {
    pub const ADDRESS: u16 = 1;
    pub const IFNAME: u16 = 3;
    pub const MTU: u16 = 4;
    pub const LINK: u16 = 5;
    pub const LINKINFO: u16 = 18;

    /// IFLA_INFO_* inside IFLA_LINKINFO.
    pub const INFO_KIND: u16 = 1;
    pub const INFO_DATA: u16 = 2;

    /// IFLA_VLAN_* inside IFLA_INFO_DATA.
    pub const VLAN_ID: u16 = 1;
}

/// Address attributes (IFA_*).
pub mod ifa {
    pub const ADDRESS: u16 = 1;
    pub const LOCAL: u16 = 2;
    pub const LABEL: u16 = 3;
    pub const BROADCAST: u16 = 4;
}

/// Route attributes (RTA_*).
pub mod rta {
    pub const DST: u16 = 1;
    pub const OIF: u16 = 4;
    pub const GATEWAY: u16 = 5;
    pub const PRIORITY: u16 = 6;
    pub const METRICS: u16 = 8;
    pub const TABLE: u16 = 15;
}

/// Route metrics nested in RTA_METRICS (RTAX_*).
pub mod rtax {
    pub const MTU: u16 = 2;
    pub const WINDOW: u16 = 3;
    pub const RTT: u16 = 4;
}

/// Neighbor attributes (NDA_*).
pub mod nda {
    pub const DST: u16 = 1;
    pub const LLADDR: u16 = 2;
}

/// Interface flags (IFF_*).
pub mod iff {
    pub const UP: u32 = 1 << 0;
    pub const RUNNING: u32 = 1 << 6;
    pub const NOARP: u32 = 1 << 7;
}

/// Neighbor states (NUD_*).
pub mod nud {
    pub const INCOMPLETE: u16 = 0x01;
    pub const REACHABLE: u16 = 0x02;
    pub const STALE: u16 = 0x04;
    pub const DELAY: u16 = 0x08;
    pub const PROBE: u16 = 0x10;
    pub const FAILED: u16 = 0x20;
    pub const NOARP: u16 = 0x40;
    pub const PERMANENT: u16 = 0x80;

    /// States in which the entry holds a usable link-layer address.
    pub const VALID: u16 = REACHABLE | STALE | DELAY | PROBE | NOARP | PERMANENT;
}

/// Routing tables.
pub mod rt_table {
    pub const MAIN: u8 = 254;
}

/// Route origin (RTPROT_*).
pub mod rtprot {
    pub const BOOT: u8 = 3;
}

/// Route scopes (RT_SCOPE_*).
pub mod rt_scope {
    pub const UNIVERSE: u8 = 0;
    pub const LINK: u8 = 253;
    pub const NOWHERE: u8 = 255;
}

/// Route types (RTN_*).
pub mod rtn {
    pub const UNICAST: u8 = 1;
    pub const UNREACHABLE: u8 = 7;
}
