//! The agent configuration tree: registry, OIDs, dispatcher and handlers.

mod agent;
mod handlers;
mod oid;
mod registry;

pub use agent::{Agent, VALUE_LIMIT};
pub use oid::{Oid, Segment};
pub use registry::{AGENT_TREE, Caps, Node, NodeSpec, Object, Registry, Verb};
