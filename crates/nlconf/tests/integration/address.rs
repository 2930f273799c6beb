//! Address integration tests.

use nlconf::MemoryBackend;
use nlconf::error::ErrorKind;

use crate::common::{agent, oid};

#[tokio::test]
async fn test_add_then_list() {
    let mut agent = agent(MemoryBackend::new());
    agent
        .add(1, &oid("interface:eth0/net_addr:10.0.0.5"), "24")
        .await
        .unwrap();

    assert_eq!(
        agent.list(1, &oid("interface:eth0/net_addr:")).await.unwrap(),
        "10.0.0.5"
    );
    assert_eq!(
        agent
            .get(1, &oid("interface:eth0/net_addr:10.0.0.5"))
            .await
            .unwrap(),
        "24"
    );
    assert_eq!(
        agent
            .get(1, &oid("interface:eth0/net_addr:10.0.0.5/broadcast:"))
            .await
            .unwrap(),
        "10.0.0.255"
    );
}

#[tokio::test]
async fn test_address_validation() {
    let mut agent = agent(MemoryBackend::new());
    let cases = [
        ("0.0.0.0", ErrorKind::InvalidValue),
        ("255.255.255.255", ErrorKind::InvalidValue),
        ("127.0.0.2", ErrorKind::InvalidValue),
        ("224.0.0.1", ErrorKind::InvalidValue),
        ("1111.0.0.1", ErrorKind::InvalidFormat),
        ("10.0.0", ErrorKind::InvalidFormat),
    ];
    for (addr, kind) in cases {
        let err = agent
            .add(1, &oid(&format!("interface:eth0/net_addr:{}", addr)), "24")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kind, "{}", addr);
    }
    assert_eq!(
        agent.list(1, &oid("interface:eth0/net_addr:")).await.unwrap(),
        ""
    );
}

#[tokio::test]
async fn test_alias_slots_exhaust_and_reuse() {
    let mut agent = agent(MemoryBackend::new().without_native_aliases());

    // The first address goes on eth0 itself, the next 32 on eth0:0..eth0:31.
    for host in 1..=33u32 {
        agent
            .add(1, &oid(&format!("interface:eth0/net_addr:10.0.0.{}", host)), "24")
            .await
            .unwrap();
    }
    let listed = agent.list(1, &oid("interface:")).await.unwrap();
    assert!(listed.contains("eth0:0 "));
    assert!(listed.ends_with("eth0:31"));

    let err = agent
        .add(1, &oid("interface:eth0/net_addr:10.0.0.34"), "24")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhausted);

    // 10.0.0.19 sits on eth0:17; freeing it makes slot 17 the lowest free.
    agent
        .del(1, &oid("interface:eth0/net_addr:10.0.0.19"))
        .await
        .unwrap();
    agent
        .add(1, &oid("interface:eth0/net_addr:10.0.0.34"), "24")
        .await
        .unwrap();
    assert!(
        agent
            .list(1, &oid("interface:eth0:17/net_addr:"))
            .await
            .unwrap()
            .contains("10.0.0.34")
    );
}

#[tokio::test]
async fn test_classful_default_prefix() {
    let mut agent = agent(MemoryBackend::new());
    agent
        .add(1, &oid("interface:eth0/net_addr:172.16.1.1"), "")
        .await
        .unwrap();
    assert_eq!(
        agent
            .get(1, &oid("interface:eth0/net_addr:172.16.1.1"))
            .await
            .unwrap(),
        "16"
    );
}
