//! `user`: tester accounts named `<prefix><uid>`.

use tracing::warn;

use crate::backend::{Backend, Tokens};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::tree::agent::Agent;

/// The uid encoded in a tester account name.
fn tester_uid(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Account names of a passwd document.
fn passwd_users(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .filter_map(|line| line.split_once(':').map(|(name, _)| name))
}

impl<B: Backend, H: Host> Agent<B, H> {
    async fn user_exists(&mut self, name: &str) -> Result<bool> {
        let path = self.config.paths.passwd.clone();
        let text = self.host.read_to_string(&path).await?;
        Ok(passwd_users(&text).any(|u| u == name))
    }

    pub(crate) async fn user_list(&mut self) -> Result<Tokens> {
        let path = self.config.paths.passwd.clone();
        let text = self.host.read_to_string(&path).await?;
        let prefix = &self.config.user_prefix;
        let names: Vec<String> = passwd_users(&text)
            .filter(|u| tester_uid(u, prefix).is_some())
            .map(str::to_owned)
            .collect();
        Ok(names.into_iter())
    }

    /// Create the account, set its password to its name and generate an SSH
    /// key. A failure after the account exists removes it again.
    pub(crate) async fn user_add(&mut self, name: &str) -> Result<()> {
        if self.user_exists(name).await? {
            return Err(Error::exists(format!("user {}", name)));
        }
        let uid = tester_uid(name, &self.config.user_prefix).ok_or_else(|| {
            Error::InvalidValue(format!(
                "user name {} does not match {}<uid>",
                name, self.config.user_prefix
            ))
        })?;

        let adduser = if self.host.run("adduser --help >/dev/null 2>&1").await.is_ok() {
            format!(
                "/usr/sbin/adduser --home /tmp/{name} --force-badname --disabled-password \
                 --gecos \"\" --uid {uid} {name} >/dev/null 2>&1"
            )
        } else {
            format!("/usr/sbin/adduser -d /tmp/{name} -u {uid} -m {name}")
        };
        self.host.run(&adduser).await?;

        let setup = [
            format!("echo {name}:{name} | /usr/sbin/chpasswd"),
            format!(
                "su - {name} -c 'ssh-keygen -t dsa -N \"\" -f /tmp/{name}/.ssh/id_dsa' \
                 >/dev/null 2>&1"
            ),
        ];
        for command in &setup {
            if let Err(e) = self.host.run(command).await {
                warn!("removing user {} after failed setup: {}", name, e);
                if let Err(rollback) = self.host.run(&format!("/usr/sbin/userdel -r {name}")).await {
                    warn!("rollback of user {} failed: {}", name, rollback);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    pub(crate) async fn user_del(&mut self, name: &str) -> Result<()> {
        if !self.user_exists(name).await? {
            return Err(Error::not_found(format!("user {}", name)));
        }
        self.host.run(&format!("/usr/sbin/userdel -r {name}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::config::AgentConfig;
    use crate::error::ErrorKind;
    use crate::host::MemoryHost;

    const PASSWD: &str = "root:x:0:0:root:/root:/bin/bash\n\
                          te_tester_1001:x:1001:1001::/tmp/te_tester_1001:/bin/sh\n\
                          te_tester_x:x:1002:1002::/tmp:/bin/sh\n";

    fn agent(host: MemoryHost) -> Agent<MemoryBackend, MemoryHost> {
        let host = host.with_file("/etc/passwd", PASSWD);
        Agent::new(AgentConfig::default(), MemoryBackend::new(), host).unwrap()
    }

    #[test]
    fn test_tester_uid() {
        assert_eq!(tester_uid("te_tester_1001", "te_tester_"), Some(1001));
        assert_eq!(tester_uid("te_tester_", "te_tester_"), None);
        assert_eq!(tester_uid("te_tester_+1", "te_tester_"), None);
        assert_eq!(tester_uid("te_tester_1x", "te_tester_"), None);
        assert_eq!(tester_uid("root", "te_tester_"), None);
    }

    #[tokio::test]
    async fn test_list() {
        let mut agent = agent(MemoryHost::new());
        assert_eq!(
            agent.list(1, "/agent:Agt_A/user:").await.unwrap(),
            "te_tester_1001"
        );
    }

    #[tokio::test]
    async fn test_add_runs_setup() {
        let mut agent = agent(MemoryHost::new());
        agent.add(1, "/agent:Agt_A/user:te_tester_1002", "").await.unwrap();
        let commands = agent.host().commands();
        assert_eq!(commands.len(), 4);
        assert!(commands[1].contains("--uid 1002 te_tester_1002"));
        assert!(commands[2].contains("chpasswd"));
        assert!(commands[3].contains("ssh-keygen"));
    }

    #[tokio::test]
    async fn test_add_rejects() {
        let mut agent = agent(MemoryHost::new());
        let err = agent
            .add(1, "/agent:Agt_A/user:te_tester_1001", "")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let err = agent.add(1, "/agent:Agt_A/user:bob", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert!(agent.host().commands().is_empty());
    }

    #[tokio::test]
    async fn test_add_rolls_back() {
        let mut agent = agent(MemoryHost::new().fail_commands_containing("ssh-keygen"));
        let err = agent
            .add(1, "/agent:Agt_A/user:te_tester_1002", "")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShellCommandFailed);
        let last = agent.host().commands().last().unwrap();
        assert_eq!(last, "/usr/sbin/userdel -r te_tester_1002");
    }

    #[tokio::test]
    async fn test_red_hat_flavor() {
        let mut agent = agent(MemoryHost::new().fail_commands_containing("--help"));
        agent.add(1, "/agent:Agt_A/user:te_tester_7", "").await.unwrap();
        assert_eq!(
            agent.host().commands()[1],
            "/usr/sbin/adduser -d /tmp/te_tester_7 -u 7 -m te_tester_7"
        );
    }

    #[tokio::test]
    async fn test_del() {
        let mut agent = agent(MemoryHost::new());
        agent.del(1, "/agent:Agt_A/user:te_tester_1001").await.unwrap();
        assert_eq!(
            agent.host().commands(),
            &["/usr/sbin/userdel -r te_tester_1001".to_owned()]
        );
        let err = agent
            .del(1, "/agent:Agt_A/user:te_tester_9")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
