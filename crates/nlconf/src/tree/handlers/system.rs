//! `dns` and `ip4_fw`.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::tree::agent::Agent;

/// First `nameserver` address of a resolv.conf document.
fn first_nameserver(text: &str) -> Option<&str> {
    text.lines().find_map(|line| {
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("nameserver"), Some(addr)) => Some(addr),
            _ => None,
        }
    })
}

impl<B: Backend, H: Host> Agent<B, H> {
    pub(crate) async fn dns_get(&mut self) -> Result<String> {
        let path = self.config.paths.resolv_conf.clone();
        let text = self.host.read_to_string(&path).await?;
        first_nameserver(&text)
            .map(str::to_owned)
            .ok_or_else(|| Error::not_found(format!("nameserver in {}", path.display())))
    }

    pub(crate) async fn ip4_fw_get(&mut self) -> Result<String> {
        let path = self.config.paths.ip_forward.clone();
        let text = self.host.read_to_string(&path).await?;
        match text.chars().next() {
            Some(c @ ('0' | '1')) => Ok(c.to_string()),
            _ => Err(Error::InvalidFormat(format!(
                "unexpected content of {}: {:?}",
                path.display(),
                text
            ))),
        }
    }

    pub(crate) async fn ip4_fw_set(&mut self, value: &str) -> Result<()> {
        if value != "0" && value != "1" {
            return Err(Error::InvalidValue(format!(
                "IPv4 forwarding must be 0 or 1, got {:?}",
                value
            )));
        }
        let path = self.config.paths.ip_forward.clone();
        self.host.write(&path, &format!("{}\n", value)).await
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::config::AgentConfig;
    use crate::error::ErrorKind;
    use crate::host::MemoryHost;

    const IP_FORWARD: &str = "/proc/sys/net/ipv4/ip_forward";

    #[test]
    fn test_first_nameserver() {
        let text = "# generated\nsearch example.com\nnameserver 10.0.0.1\nnameserver 10.0.0.2\n";
        assert_eq!(first_nameserver(text), Some("10.0.0.1"));
        assert_eq!(first_nameserver("nameserver\n"), None);
        assert_eq!(first_nameserver(""), None);
    }

    #[tokio::test]
    async fn test_dns() {
        let host = MemoryHost::new().with_file("/etc/resolv.conf", "nameserver 192.0.2.53\n");
        let mut agent = Agent::new(AgentConfig::default(), MemoryBackend::new(), host).unwrap();
        assert_eq!(agent.get(1, "/agent:Agt_A/dns:").await.unwrap(), "192.0.2.53");

        agent
            .host_mut()
            .write(Path::new("/etc/resolv.conf"), "search x\n")
            .await
            .unwrap();
        let err = agent.get(1, "/agent:Agt_A/dns:").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_ip4_fw() {
        let host = MemoryHost::new().with_file(IP_FORWARD, "0\n");
        let mut agent = Agent::new(AgentConfig::default(), MemoryBackend::new(), host).unwrap();
        assert_eq!(agent.get(1, "/agent:Agt_A/ip4_fw:").await.unwrap(), "0");

        agent.set(1, "/agent:Agt_A/ip4_fw:", "1").await.unwrap();
        assert_eq!(agent.host().file(IP_FORWARD), Some("1\n"));
        assert_eq!(agent.get(1, "/agent:Agt_A/ip4_fw:").await.unwrap(), "1");

        for bad in ["", "2", "on", "1\n"] {
            let err = agent.set(1, "/agent:Agt_A/ip4_fw:", bad).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidValue);
        }
    }
}
