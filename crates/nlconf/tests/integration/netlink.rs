//! Live rtnetlink tests. Read-only: they only dump kernel state.

use nlconf::{Agent, AgentConfig, Backend, MemoryHost, Result};

#[tokio::test]
async fn test_dump_interfaces() -> Result<()> {
    let mut backend = require_netlink!();

    let links = backend.interfaces().await?;
    let lo = links
        .iter()
        .find(|l| l.name == "lo")
        .expect("loopback is always present");
    assert!(lo.index > 0);

    let addrs = backend.addresses().await?;
    assert!(addrs.iter().all(|a| a.prefix <= 32));
    Ok(())
}

#[tokio::test]
async fn test_routes_use_listing_names() -> Result<()> {
    let backend = require_netlink!();
    let mut agent = Agent::new(AgentConfig::default(), backend, MemoryHost::new())?;

    let listed = agent.list(1, "/agent:Agt_A/route:").await?;
    for name in listed.split_whitespace() {
        let key = nlconf::decode_route(name)?;
        assert_eq!(nlconf::encode_route(&key), name);
        // Every listed name resolves to a live route.
        agent.get(1, &format!("/agent:Agt_A/route:{}", name)).await?;
    }
    Ok(())
}
