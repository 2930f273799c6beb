//! Minimal async rtnetlink transport: framing, attribute codec, typed dump
//! replies, and the link/address/route/neighbor requests the reference
//! backend issues.

pub mod addr;
pub mod attr;
pub mod builder;
pub mod connection;
pub mod error;
mod link;
pub mod message;
pub mod messages;
pub mod neigh;
pub mod parse;
pub mod route;
pub mod socket;
pub mod types;

pub use addr::Ipv4Address;
pub use attr::{AttrIter, NlAttr};
pub use builder::{MessageBuilder, NestToken};
pub use connection::Connection;
pub use error::{Error, Result};
pub use message::{Frame, FrameKind, Frames, NLMSG_HDRLEN, NlMsgHdr};
pub use messages::{AddressMessage, LinkMessage, NeighborMessage, RouteMessage};
pub use neigh::Neighbor;
pub use route::{Ipv4Route, RouteMetrics};
pub use socket::NetlinkSocket;
