//! Agent-side configuration object tree for Linux hosts.
//!
//! Network and OS state (interfaces, IPv4 addresses, routes, ARP entries,
//! VLANs, environment variables and tester accounts) is exposed as a tree
//! of objects addressed by OIDs such as
//! `/agent:Agt_A/interface:eth0/net_addr:10.0.0.5`, and manipulated with
//! five verbs: get, set, add, del and list. Routes additionally support
//! staged, multi-attribute updates applied atomically on commit.
//!
//! Requests reach the OS through a [`Backend`]:
//!
//! - [`NetlinkBackend`] - rtnetlink
//! - [`IoctlBackend`] - ioctl sockets and procfs
//! - [`MemoryBackend`] - in-memory, for tests
//!
//! # Example
//!
//! ```ignore
//! use nlconf::{Agent, AgentConfig, NetlinkBackend, SystemHost};
//!
//! #[tokio::main]
//! async fn main() -> nlconf::Result<()> {
//!     let mut agent = Agent::new(AgentConfig::default(), NetlinkBackend::new()?, SystemHost)?;
//!
//!     agent.add(1, "/agent:Agt_A/interface:eth0/net_addr:10.0.0.5", "24").await?;
//!     println!("{}", agent.list(1, "/agent:Agt_A/interface:eth0/net_addr:").await?);
//!
//!     agent.add(1, "/agent:Agt_A/route:10.1.0.0|16,gw=10.0.0.1", "").await?;
//!     agent.set(1, "/agent:Agt_A/route:10.1.0.0|16,gw=10.0.0.1/metric:", "5").await?;
//!     agent.commit(1, "/agent:Agt_A/route:10.1.0.0|16,gw=10.0.0.1").await?;
//!     Ok(())
//! }
//! ```

pub mod alias;
pub mod backend;
pub mod config;
pub mod error;
pub mod host;
pub mod key;
pub mod netlink;
pub mod staging;
pub mod tree;
pub mod util;

pub use backend::{Backend, Fault, IoctlBackend, MemoryBackend, NetlinkBackend, RouteChange};
pub use config::{AgentConfig, BackendKind};
pub use error::{Error, ErrorKind, Result};
pub use host::{Host, MemoryHost, SystemHost};
pub use key::{RouteFields, RouteFlags, RouteKey, decode_route, encode_route};
pub use staging::{GroupId, StagedStore};
pub use tree::{Agent, Oid, Registry, Verb};
