//! Tester account integration tests.

use nlconf::error::ErrorKind;
use nlconf::{MemoryBackend, MemoryHost};

use crate::common::{agent_with_host, oid};

const PASSWD: &str = "root:x:0:0:root:/root:/bin/bash\n";

#[tokio::test]
async fn test_password_failure_removes_user() {
    let host = MemoryHost::new()
        .with_file("/etc/passwd", PASSWD)
        .fail_commands_containing("chpasswd");
    let mut agent = agent_with_host(MemoryBackend::new(), host);

    let err = agent
        .add(1, &oid("user:te_tester_4242"), "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShellCommandFailed);

    let commands = agent.host().commands();
    assert!(commands.iter().all(|c| !c.contains("ssh-keygen")));
    assert_eq!(
        commands.last().map(String::as_str),
        Some("/usr/sbin/userdel -r te_tester_4242")
    );
}

#[tokio::test]
async fn test_add_failure_runs_nothing_else() {
    let host = MemoryHost::new()
        .with_file("/etc/passwd", PASSWD)
        .fail_commands_containing("/usr/sbin/adduser");
    let mut agent = agent_with_host(MemoryBackend::new(), host);

    let err = agent
        .add(1, &oid("user:te_tester_4242"), "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShellCommandFailed);
    assert_eq!(agent.host().commands().len(), 2);
}
