//! Environment variable integration tests.

use nlconf::error::ErrorKind;
use nlconf::{MemoryBackend, MemoryHost};

use crate::common::{agent_with_host, oid};

#[tokio::test]
async fn test_hidden_variables() {
    let host = MemoryHost::new()
        .with_var("LANG", "C")
        .with_var("SSH_CONNECTION", "10.0.0.1 22 10.0.0.2 22")
        .with_var("SUDO_COMMAND", "/bin/agent")
        .with_var("TE_RPC_PORT", "4000");
    let mut agent = agent_with_host(MemoryBackend::new(), host);

    assert_eq!(agent.list(1, &oid("env:")).await.unwrap(), "LANG");

    for name in ["SSH_CONNECTION", "SUDO_COMMAND", "TE_RPC_PORT"] {
        let path = oid(&format!("env:{}", name));
        assert_eq!(
            agent.get(1, &path).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            agent.set(1, &path, "x").await.unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            agent.del(1, &path).await.unwrap_err().kind(),
            ErrorKind::PermissionDenied
        );
    }
}

#[tokio::test]
async fn test_prefix_of_hidden_name_is_visible() {
    let host = MemoryHost::new().with_var("TE_RPC", "1");
    let mut agent = agent_with_host(MemoryBackend::new(), host);
    assert_eq!(agent.get(1, &oid("env:TE_RPC")).await.unwrap(), "1");
}
