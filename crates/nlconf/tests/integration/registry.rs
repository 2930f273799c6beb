//! Object tree integration tests.

use nlconf::error::ErrorKind;
use nlconf::tree::{AGENT_TREE, Caps, NodeSpec, Object};
use nlconf::{MemoryBackend, Registry};

use crate::common::{agent, oid};

#[test]
fn test_agent_tree_shape() {
    let registry = Registry::agent().unwrap();
    let paths: Vec<String> = registry.paths().into_iter().map(|(p, _)| p).collect();
    assert_eq!(paths.len(), AGENT_TREE.len());
    assert!(paths.contains(&"/volatile/arp".to_owned()));
    assert!(paths.contains(&"/interface/net_addr/broadcast".to_owned()));
    assert!(paths.contains(&"/interface/net_addr/prefix".to_owned()));

    let route = registry.find(&["route"]).unwrap();
    assert!(registry.node(route).caps.contains(Caps::SET | Caps::COMMIT));

    let arp = registry.find(&["volatile", "arp"]).unwrap();
    assert_eq!(registry.node(arp).object, Object::VolatileArp);
    assert_eq!(registry.find(&["arp", "volatile"]), None);
}

#[test]
fn test_sibling_collision() {
    let specs = [
        NodeSpec {
            path: "env",
            caps: Caps::GET,
            object: Object::Env,
        },
        NodeSpec {
            path: "env",
            caps: Caps::GET | Caps::SET,
            object: Object::Env,
        },
    ];
    assert_eq!(
        Registry::build(&specs).unwrap_err().kind(),
        ErrorKind::AlreadyExists
    );
}

#[test]
fn test_child_before_parent() {
    let specs = [
        NodeSpec {
            path: "route/metric",
            caps: Caps::GET,
            object: Object::RouteMetric,
        },
        NodeSpec {
            path: "route",
            caps: Caps::GET,
            object: Object::Route,
        },
    ];
    assert_eq!(
        Registry::build(&specs).unwrap_err().kind(),
        ErrorKind::InvalidFormat
    );
}

#[tokio::test]
async fn test_volatile_node_has_no_verbs() {
    let mut agent = agent(MemoryBackend::new());
    let err = agent.list(1, &oid("volatile:")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert_eq!(agent.list(1, &oid("volatile:/arp:")).await.unwrap(), "");
}
