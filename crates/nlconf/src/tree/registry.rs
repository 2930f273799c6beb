//! Object tree registry.
//!
//! The tree is declared as a flat list of `(path, capabilities, object)`
//! entries and linked once at start-up. After [`Registry::build`] it is
//! immutable and serves as the dispatch table.

use std::fmt;
use std::ops::BitOr;

use crate::error::{Error, Result};

/// Verbs a node accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Caps(u8);

impl Caps {
    pub const NONE: Self = Self(0);
    pub const GET: Self = Self(1 << 0);
    pub const SET: Self = Self(1 << 1);
    pub const ADD: Self = Self(1 << 2);
    pub const DEL: Self = Self(1 << 3);
    pub const LIST: Self = Self(1 << 4);
    pub const COMMIT: Self = Self(1 << 5);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Caps {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::GET, "get"),
            (Self::SET, "set"),
            (Self::ADD, "add"),
            (Self::DEL, "del"),
            (Self::LIST, "list"),
            (Self::COMMIT, "commit"),
        ];
        let mut first = true;
        for (cap, name) in names {
            if self.contains(cap) {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

/// Request verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Set,
    Add,
    Del,
    List,
    Commit,
}

impl Verb {
    /// The capability a node needs to accept this verb.
    pub fn cap(self) -> Caps {
        match self {
            Self::Get => Caps::GET,
            Self::Set => Caps::SET,
            Self::Add => Caps::ADD,
            Self::Del => Caps::DEL,
            Self::List => Caps::LIST,
            Self::Commit => Caps::COMMIT,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Add => "add",
            Self::Del => "del",
            Self::List => "list",
            Self::Commit => "commit",
        })
    }
}

/// Which handler serves a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Object {
    Agent,
    Interface,
    InterfaceIndex,
    NetAddr,
    Prefix,
    Broadcast,
    LinkAddr,
    InterfaceArp,
    Mtu,
    Status,
    Dns,
    Arp,
    Volatile,
    VolatileArp,
    Route,
    RouteMetric,
    RouteMtu,
    RouteWin,
    RouteIrtt,
    Env,
    Ip4Fw,
    User,
}

/// Declaration of one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeSpec {
    /// Sub-identifiers from below the root, joined by `/`.
    pub path: &'static str,
    pub caps: Caps,
    pub object: Object,
}

const fn node(path: &'static str, caps: Caps, object: Object) -> NodeSpec {
    NodeSpec { path, caps, object }
}

const GS: Caps = Caps(Caps::GET.0 | Caps::SET.0);
const GSADL: Caps = Caps(Caps::GET.0 | Caps::SET.0 | Caps::ADD.0 | Caps::DEL.0 | Caps::LIST.0);

/// The object tree served under `/agent`.
pub const AGENT_TREE: &[NodeSpec] = &[
    node(
        "interface",
        Caps(Caps::ADD.0 | Caps::DEL.0 | Caps::LIST.0),
        Object::Interface,
    ),
    node("interface/index", Caps::GET, Object::InterfaceIndex),
    node("interface/net_addr", GSADL, Object::NetAddr),
    node("interface/net_addr/prefix", GS, Object::Prefix),
    node("interface/net_addr/broadcast", GS, Object::Broadcast),
    node("interface/link_addr", Caps::GET, Object::LinkAddr),
    node("interface/arp", GS, Object::InterfaceArp),
    node("interface/mtu", GS, Object::Mtu),
    node("interface/status", GS, Object::Status),
    node("dns", Caps::GET, Object::Dns),
    node("arp", GSADL, Object::Arp),
    node("volatile", Caps::NONE, Object::Volatile),
    node("volatile/arp", GSADL, Object::VolatileArp),
    node("route", Caps(GSADL.0 | Caps::COMMIT.0), Object::Route),
    node("route/metric", GS, Object::RouteMetric),
    node("route/mtu", GS, Object::RouteMtu),
    node("route/win", GS, Object::RouteWin),
    node("route/irtt", GS, Object::RouteIrtt),
    node("env", GSADL, Object::Env),
    node("ip4_fw", GS, Object::Ip4Fw),
    node(
        "user",
        Caps(Caps::ADD.0 | Caps::DEL.0 | Caps::LIST.0),
        Object::User,
    ),
];

/// A linked tree node.
#[derive(Debug, Clone)]
pub struct Node {
    pub sub_id: String,
    pub caps: Caps,
    pub object: Object,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// The linked, immutable object tree.
#[derive(Debug, Clone)]
pub struct Registry {
    nodes: Vec<Node>,
}

impl Registry {
    /// Root node index.
    pub const ROOT: usize = 0;

    /// Link `specs` under an `agent` root.
    ///
    /// Every parent must be declared before its children. Empty path
    /// segments and missing parents are `InvalidFormat`; two siblings with
    /// the same sub-id are `AlreadyExists`.
    pub fn build(specs: &[NodeSpec]) -> Result<Self> {
        let mut registry = Self {
            nodes: vec![Node {
                sub_id: "agent".into(),
                caps: Caps::NONE,
                object: Object::Agent,
                parent: None,
                children: Vec::new(),
            }],
        };

        for spec in specs {
            let segments: Vec<&str> = spec.path.split('/').collect();
            if segments.iter().any(|s| s.is_empty()) {
                return Err(Error::InvalidFormat(format!(
                    "empty segment in node path {:?}",
                    spec.path
                )));
            }
            let (name, ancestors) = segments
                .split_last()
                .ok_or_else(|| Error::InvalidFormat("empty node path".into()))?;

            let parent = registry.find(ancestors).ok_or_else(|| {
                Error::InvalidFormat(format!("parent of {} is not declared", spec.path))
            })?;
            if registry.child(parent, name).is_some() {
                return Err(Error::exists(format!("node {}", spec.path)));
            }

            let index = registry.nodes.len();
            registry.nodes.push(Node {
                sub_id: (*name).to_owned(),
                caps: spec.caps,
                object: spec.object,
                parent: Some(parent),
                children: Vec::new(),
            });
            registry.nodes[parent].children.push(index);
        }
        Ok(registry)
    }

    /// The agent tree.
    pub fn agent() -> Result<Self> {
        Self::build(AGENT_TREE)
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Child of `parent` named `sub_id`.
    pub fn child(&self, parent: usize, sub_id: &str) -> Option<usize> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].sub_id == sub_id)
    }

    /// Node reached by following `sub_ids` from the root.
    pub fn find<S: AsRef<str>>(&self, sub_ids: &[S]) -> Option<usize> {
        sub_ids
            .iter()
            .try_fold(Self::ROOT, |at, s| self.child(at, s.as_ref()))
    }

    /// Every node below the root as `(path, caps)`, depth first.
    pub fn paths(&self) -> Vec<(String, Caps)> {
        let mut out = Vec::new();
        self.walk(Self::ROOT, String::new(), &mut out);
        out
    }

    fn walk(&self, at: usize, prefix: String, out: &mut Vec<(String, Caps)>) {
        for &child in &self.nodes[at].children {
            let path = format!("{}/{}", prefix, self.nodes[child].sub_id);
            out.push((path.clone(), self.nodes[child].caps));
            self.walk(child, path, out);
        }
    }
}
