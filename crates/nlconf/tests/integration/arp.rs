//! Neighbor (ARP) integration tests.

use nlconf::backend::NeighborEntry;
use nlconf::error::ErrorKind;
use nlconf::{Fault, MemoryBackend};
use std::net::Ipv4Addr;

use crate::common::{agent, oid};

fn dynamic_entry() -> NeighborEntry {
    NeighborEntry {
        address: Ipv4Addr::new(10, 0, 0, 7),
        lladdr: Some([0x02, 0, 0, 0, 0, 0x07]),
        ifname: "eth0".into(),
        permanent: false,
        complete: true,
    }
}

#[tokio::test]
async fn test_delete_of_gone_entry_succeeds() {
    let mut agent = agent(MemoryBackend::new().with_neighbor(dynamic_entry()));

    for errno in [libc::ENXIO, libc::ENETDOWN, libc::ENETUNREACH] {
        agent.backend_mut().fail_next(Fault::NeighborDelete, errno);
        agent.del(1, &oid("volatile:/arp:10.0.0.7")).await.unwrap();
    }
    agent.del(1, &oid("volatile:/arp:10.0.0.7")).await.unwrap();
}

#[tokio::test]
async fn test_double_delete_succeeds() {
    let mut agent = agent(MemoryBackend::new().with_neighbor(dynamic_entry()));
    let entry = oid("volatile:/arp:10.0.0.7");

    agent.del(1, &entry).await.unwrap();
    assert_eq!(agent.get(1, &entry).await.unwrap_err().kind(), ErrorKind::NotFound);

    // The entry is gone, so the second delete never reaches the backend.
    agent
        .backend_mut()
        .fail_next(Fault::NeighborDelete, libc::EPERM);
    agent.del(1, &entry).await.unwrap();
    assert_eq!(agent.list(1, &oid("volatile:/arp:")).await.unwrap(), "");
}

#[tokio::test]
async fn test_delete_outside_view_succeeds() {
    let mut agent = agent(MemoryBackend::new().with_neighbor(dynamic_entry()));

    // The entry is dynamic, so the static view does not see it.
    agent.del(1, &oid("arp:10.0.0.7")).await.unwrap();
    assert_eq!(
        agent.get(1, &oid("volatile:/arp:10.0.0.7")).await.unwrap(),
        "02:00:00:00:00:07"
    );
}

#[tokio::test]
async fn test_delete_keeps_other_errors() {
    let mut agent = agent(MemoryBackend::new().with_neighbor(dynamic_entry()));
    agent
        .backend_mut()
        .fail_next(Fault::NeighborDelete, libc::EPERM);
    let err = agent
        .del(1, &oid("volatile:/arp:10.0.0.7"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert_eq!(err.code(), libc::EPERM);
}

#[tokio::test]
async fn test_incomplete_entries_are_hidden() {
    let mut entry = dynamic_entry();
    entry.lladdr = None;
    entry.complete = false;
    let mut agent = agent(MemoryBackend::new().with_neighbor(entry));

    assert_eq!(agent.list(1, &oid("volatile:/arp:")).await.unwrap(), "");
    let err = agent
        .get(1, &oid("volatile:/arp:10.0.0.7"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
