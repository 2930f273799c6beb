//! Route integration tests.

use nlconf::error::ErrorKind;
use nlconf::{MemoryBackend, RouteChange, RouteKey, decode_route, encode_route};
use std::net::Ipv4Addr;

use crate::common::{agent, oid};

#[test]
fn test_instance_name_round_trip() {
    let names = [
        "0.0.0.0|0,gw=10.0.0.1",
        "10.1.0.0|16,dev=eth0",
        "10.1.0.0|16,gw=10.0.0.1,dev=eth0,metric=5,mss=1400,window=8192,irtt=30",
        "192.0.2.0|24,reject",
        "192.0.2.1|32,dev=eth0:1,metric=0",
    ];
    for name in names {
        let key = decode_route(name).unwrap();
        assert_eq!(encode_route(&key), name);
        assert_eq!(decode_route(&encode_route(&key)).unwrap(), key);
    }

    let key = RouteKey::new(Ipv4Addr::new(10, 2, 0, 0), 15)
        .unwrap()
        .with_gateway(Ipv4Addr::new(10, 0, 0, 1))
        .with_metric(7);
    assert_eq!(decode_route(&encode_route(&key)).unwrap(), key);
}

#[test]
fn test_round_trip_every_field_combination() {
    for mask in 0u8..128 {
        for zero in [false, true] {
            let has = |bit: u8| mask & (1 << bit) != 0;
            let num = |v: u32| if zero { 0 } else { v };

            let mut key = RouteKey::new(Ipv4Addr::new(10, 1, 0, 0), 16).unwrap();
            if has(0) {
                key.set_gateway(Some(Ipv4Addr::new(10, 0, 0, 1)));
            }
            if has(1) {
                key.set_dev(Some("eth0.100")).unwrap();
            }
            if has(2) {
                key.set_metric(Some(num(5)));
            }
            if has(3) {
                key.set_mss(Some(num(1400)));
            }
            if has(4) {
                key.set_window(Some(num(8192)));
            }
            if has(5) {
                key.set_irtt(Some(num(30)));
            }
            if has(6) {
                key.set_reject(true);
            }

            let name = encode_route(&key);
            assert_eq!(name.split(',').count(), 1 + mask.count_ones() as usize, "{}", name);
            assert_eq!(decode_route(&name).unwrap(), key, "{}", name);

            // Fields may come in any order.
            let (head, fields) = name.split_once(',').unwrap_or((name.as_str(), ""));
            let mut reversed = head.to_owned();
            for field in fields.split(',').filter(|f| !f.is_empty()).rev() {
                reversed.push(',');
                reversed.push_str(field);
            }
            assert_eq!(decode_route(&reversed).unwrap(), key, "{}", reversed);
        }
    }
}

#[test]
fn test_instance_name_order_is_free() {
    let a = decode_route("10.1.0.0|16,metric=5,gw=10.0.0.1").unwrap();
    let b = decode_route("10.1.0.0|16,gw=10.0.0.1,metric=5").unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_bad_instance_names() {
    for bad in [
        "10.1.0.0|33",
        "10.1.0.0",
        "10.1.0.0|16,gw=10.0.0",
        "10.1.0.0|16,metric=x",
        "10.1.0.0|16,color=red",
        "10.1.0.0|16,metric=1,metric=2",
    ] {
        assert_eq!(
            decode_route(bad).unwrap_err().kind(),
            ErrorKind::InvalidFormat,
            "{}",
            bad
        );
    }
}

#[tokio::test]
async fn test_staged_commit_is_atomic() {
    let live = decode_route("10.1.0.0|16,gw=10.0.0.1,metric=1").unwrap();
    let mut agent = agent(MemoryBackend::new().with_route(live));
    let route = oid("route:10.1.0.0|16,gw=10.0.0.1");

    agent.set(1, &format!("{}/metric:", route), "9").await.unwrap();
    agent.set(1, &format!("{}/mtu:", route), "1400").await.unwrap();
    agent.set(1, &format!("{}/win:", route), "8192").await.unwrap();

    // Nothing reaches the backend before the commit.
    assert!(agent.backend().route_log().is_empty());
    assert_eq!(agent.get(1, &format!("{}/metric:", route)).await.unwrap(), "1");

    agent.commit(1, &format!("{}/win:", route)).await.unwrap();
    assert_eq!(agent.backend().route_log().len(), 1);
    match &agent.backend().route_log()[0] {
        RouteChange::Replace { current, desired } => {
            assert_eq!(current.to_string(), "10.1.0.0|16,gw=10.0.0.1,metric=1");
            assert_eq!(
                desired.to_string(),
                "10.1.0.0|16,gw=10.0.0.1,metric=9,mss=1400,window=8192"
            );
        }
        other => panic!("unexpected change: {:?}", other),
    }
    assert_eq!(agent.get(1, &format!("{}/metric:", route)).await.unwrap(), "9");
    assert_eq!(agent.get(1, &format!("{}/mtu:", route)).await.unwrap(), "1400");
}

#[tokio::test]
async fn test_commit_with_nothing_staged() {
    let mut agent = agent(MemoryBackend::new());
    agent
        .commit(1, &oid("route:10.1.0.0|16,dev=eth0"))
        .await
        .unwrap();
    assert!(agent.backend().route_log().is_empty());
}

#[tokio::test]
async fn test_full_lifecycle() {
    let mut agent = agent(MemoryBackend::new());
    let route = oid("route:10.9.0.0|16,dev=eth0");

    agent.add(7, &route, "").await.unwrap();
    agent.commit(7, &route).await.unwrap();
    assert_eq!(agent.get(7, &route).await.unwrap(), "");

    agent.set(7, &format!("{}/irtt:", route), "20").await.unwrap();
    agent.commit(7, &route).await.unwrap();
    assert_eq!(agent.get(7, &format!("{}/irtt:", route)).await.unwrap(), "20");

    agent.del(7, &route).await.unwrap();
    agent.commit(7, &route).await.unwrap();
    assert_eq!(agent.get(7, &route).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(agent.backend().route_log().len(), 3);
}

#[tokio::test]
async fn test_routes_differing_by_metric() {
    let backend = MemoryBackend::new()
        .with_route(decode_route("10.1.0.0|16,gw=10.0.0.1,metric=1").unwrap())
        .with_route(decode_route("10.1.0.0|16,gw=10.0.0.1,metric=2").unwrap());
    let mut agent = agent(backend);

    assert_eq!(
        agent.list(1, &oid("route:")).await.unwrap(),
        "10.1.0.0|16,gw=10.0.0.1,metric=1 10.1.0.0|16,gw=10.0.0.1,metric=2"
    );

    let second = oid("route:10.1.0.0|16,gw=10.0.0.1,metric=2");
    agent.del(1, &second).await.unwrap();
    agent.commit(1, &second).await.unwrap();
    assert_eq!(
        agent.list(1, &oid("route:")).await.unwrap(),
        "10.1.0.0|16,gw=10.0.0.1,metric=1"
    );
    assert_eq!(agent.get(1, &second).await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_of_absent_route() {
    let mut agent = agent(MemoryBackend::new());
    let route = oid("route:10.1.0.0|16,dev=eth0");
    assert_eq!(agent.del(1, &route).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert!(agent.staged().is_empty());
}

#[tokio::test]
async fn test_route_flags_value() {
    let live = decode_route("10.1.0.0|16,gw=10.0.0.1").unwrap();
    let mut agent = agent(MemoryBackend::new().with_route(live));
    let route = oid("route:10.1.0.0|16,gw=10.0.0.1");

    agent.set(1, &route, "reinstate dyn").await.unwrap();
    agent.commit(1, &route).await.unwrap();
    assert_eq!(agent.get(1, &route).await.unwrap(), "dyn reinstate");
    // Flags are route state, not part of the name.
    assert_eq!(
        agent.list(1, &oid("route:")).await.unwrap(),
        "10.1.0.0|16,gw=10.0.0.1"
    );
}

#[tokio::test]
async fn test_abandon_drops_group() {
    let mut agent = agent(MemoryBackend::new());
    agent.add(1, &oid("route:10.1.0.0|16,dev=eth0"), "").await.unwrap();
    agent.add(1, &oid("route:10.2.0.0|16,dev=eth0"), "").await.unwrap();
    agent.add(2, &oid("route:10.3.0.0|16,dev=eth0"), "").await.unwrap();

    assert_eq!(agent.abandon(1), 2);
    assert_eq!(agent.staged().len(), 1);

    agent.commit(1, &oid("route:10.1.0.0|16,dev=eth0")).await.unwrap();
    assert!(agent.backend().route_log().is_empty());
}
