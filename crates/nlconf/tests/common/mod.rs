//! Common test utilities for integration tests.

use nlconf::{Agent, AgentConfig, MemoryBackend, MemoryHost};

/// Root of every OID in these tests.
pub const TA: &str = "/agent:Agt_A";

/// Full OID for `path` below the agent root.
pub fn oid(path: &str) -> String {
    format!("{}/{}", TA, path)
}

/// Agent over `backend` with an empty in-memory host.
pub fn agent(backend: MemoryBackend) -> Agent<MemoryBackend, MemoryHost> {
    agent_with_host(backend, MemoryHost::new())
}

pub fn agent_with_host(
    backend: MemoryBackend,
    host: MemoryHost,
) -> Agent<MemoryBackend, MemoryHost> {
    Agent::new(AgentConfig::default(), backend, host).expect("agent tree builds")
}

/// Skip the test if no rtnetlink socket can be opened.
#[macro_export]
macro_rules! require_netlink {
    () => {
        match nlconf::NetlinkBackend::new() {
            Ok(backend) => backend,
            Err(e) => {
                eprintln!("Skipping test: no rtnetlink socket: {}", e);
                return Ok(());
            }
        }
    };
}
