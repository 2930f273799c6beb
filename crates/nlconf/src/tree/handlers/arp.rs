//! `arp` (static entries) and `volatile/arp` (dynamic entries).

use std::net::Ipv4Addr;

use tracing::warn;

use crate::backend::{Backend, NeighborEntry};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::key::decode_ipv4;
use crate::tree::agent::Agent;
use crate::util::{format_mac, parse_mac};

fn view(volatile: bool) -> &'static str {
    if volatile { "volatile" } else { "static" }
}

impl<B: Backend, H: Host> Agent<B, H> {
    /// The complete entry for `addr` whose permanence matches the view.
    async fn arp_find(&mut self, addr: Ipv4Addr, volatile: bool) -> Result<Option<NeighborEntry>> {
        Ok(self
            .backend
            .neighbors()
            .await?
            .into_iter()
            .find(|n| n.address == addr && n.complete && n.permanent != volatile))
    }

    pub(crate) async fn arp_get(&mut self, addr: &str, volatile: bool) -> Result<String> {
        let addr = decode_ipv4(addr)?;
        let entry = self
            .arp_find(addr, volatile)
            .await?
            .ok_or_else(|| Error::not_found(format!("{} ARP entry {}", view(volatile), addr)))?;
        Ok(format_mac(&entry.lladdr.unwrap_or_default()))
    }

    pub(crate) async fn arp_set(&mut self, addr: &str, value: &str, volatile: bool) -> Result<()> {
        let addr = decode_ipv4(addr)?;
        let mac = parse_mac(value)?;
        if self.arp_find(addr, volatile).await?.is_none() {
            return Err(Error::not_found(format!(
                "{} ARP entry {}",
                view(volatile),
                addr
            )));
        }
        self.backend.neighbor_set(addr, mac, !volatile).await
    }

    pub(crate) async fn arp_add(&mut self, addr: &str, value: &str, volatile: bool) -> Result<()> {
        let addr = decode_ipv4(addr)?;
        let mac = parse_mac(value)?;
        self.backend.neighbor_set(addr, mac, !volatile).await
    }

    /// Delete the entry. An entry missing from the view counts as deleted.
    pub(crate) async fn arp_del(&mut self, addr: &str, volatile: bool) -> Result<()> {
        let addr = decode_ipv4(addr)?;
        if self.arp_find(addr, volatile).await?.is_none() {
            warn!("{} ARP entry {} not present", view(volatile), addr);
            return Ok(());
        }
        self.backend.neighbor_delete(addr).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Fault, MemoryBackend};
    use crate::config::AgentConfig;
    use crate::error::ErrorKind;
    use crate::host::MemoryHost;

    const STATIC: &str = "/agent:Agt_A/arp:10.0.0.9";
    const VOLATILE: &str = "/agent:Agt_A/volatile:/arp:10.0.0.7";

    async fn agent() -> Agent<MemoryBackend, MemoryHost> {
        let backend = MemoryBackend::new().with_neighbor(NeighborEntry {
            address: Ipv4Addr::new(10, 0, 0, 7),
            lladdr: Some([2, 0, 0, 0, 0, 7]),
            ifname: "eth0".into(),
            permanent: false,
            complete: true,
        });
        let mut agent = Agent::new(AgentConfig::default(), backend, MemoryHost::new()).unwrap();
        agent
            .add(1, "/agent:Agt_A/interface:eth0/net_addr:10.0.0.5", "24")
            .await
            .unwrap();
        agent
    }

    #[tokio::test]
    async fn test_static_lifecycle() {
        let mut agent = agent().await;
        agent.add(1, STATIC, "02:00:00:00:00:09").await.unwrap();
        assert_eq!(agent.get(1, STATIC).await.unwrap(), "02:00:00:00:00:09");
        assert_eq!(agent.list(1, "/agent:Agt_A/arp:").await.unwrap(), "10.0.0.9");

        agent.set(1, STATIC, "02:00:00:00:00:0A").await.unwrap();
        assert_eq!(agent.get(1, STATIC).await.unwrap(), "02:00:00:00:00:0a");

        agent.del(1, STATIC).await.unwrap();
        assert_eq!(agent.get(1, STATIC).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_views_are_separate() {
        let mut agent = agent().await;
        assert_eq!(agent.get(1, VOLATILE).await.unwrap(), "02:00:00:00:00:07");
        let err = agent.get(1, "/agent:Agt_A/arp:10.0.0.7").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            agent.list(1, "/agent:Agt_A/volatile:/arp:").await.unwrap(),
            "10.0.0.7"
        );
        assert_eq!(agent.list(1, "/agent:Agt_A/arp:").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_set_requires_entry() {
        let mut agent = agent().await;
        let err = agent.set(1, STATIC, "02:00:00:00:00:09").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_bad_mac() {
        let mut agent = agent().await;
        let err = agent.add(1, STATIC, "02:00:00:00:00").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let mut agent = agent().await;
        agent.del(1, STATIC).await.unwrap();

        agent
            .backend_mut()
            .fail_next(Fault::NeighborDelete, libc::ENXIO);
        agent.del(1, VOLATILE).await.unwrap();
    }
}
