//! Request dispatcher.
//!
//! [`Agent`] owns the registry, the staged store, the backend and the host.
//! Every verb parses the OID, walks the registry, checks the node's
//! capabilities and calls the handler for the node's object. Requests take
//! `&mut self`, so they are served one at a time.

use tracing::{debug, error};

use super::oid::Oid;
use super::registry::{Caps, Object, Registry, Verb};
use crate::backend::Backend;
use crate::config::AgentConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::host::{Host, SystemHost};
use crate::staging::{GroupId, StagedStore};

/// Values returned by `get` must be shorter than this.
pub const VALUE_LIMIT: usize = 1024;

/// The configuration tree of one test agent.
#[derive(Debug)]
pub struct Agent<B, H = SystemHost> {
    pub(crate) registry: Registry,
    pub(crate) config: AgentConfig,
    pub(crate) backend: B,
    pub(crate) host: H,
    pub(crate) staged: StagedStore,
}

impl<B: Backend, H: Host> Agent<B, H> {
    pub fn new(config: AgentConfig, backend: B, host: H) -> Result<Self> {
        debug!(agent = %config.name, backend = backend.name(), "building object tree");
        Ok(Self {
            registry: Registry::agent()?,
            config,
            backend,
            host,
            staged: StagedStore::new(),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn staged(&self) -> &StagedStore {
        &self.staged
    }

    /// Read the value of an instance.
    pub async fn get(&mut self, group: GroupId, oid: &str) -> Result<String> {
        let (object, oid) = self.resolve(group, Verb::Get, oid)?;
        let result = self.dispatch_get(object, &oid).await;
        let value = report(Verb::Get, &oid, result)?;
        if value.len() >= VALUE_LIMIT {
            return Err(Error::BufferTooSmall {
                len: value.len(),
                limit: VALUE_LIMIT,
            });
        }
        Ok(value)
    }

    /// Change the value of an instance.
    pub async fn set(&mut self, group: GroupId, oid: &str, value: &str) -> Result<()> {
        let (object, oid) = self.resolve(group, Verb::Set, oid)?;
        let result = self.dispatch_set(group, object, &oid, value).await;
        report(Verb::Set, &oid, result)
    }

    /// Create an instance.
    pub async fn add(&mut self, group: GroupId, oid: &str, value: &str) -> Result<()> {
        let (object, oid) = self.resolve(group, Verb::Add, oid)?;
        let result = self.dispatch_add(group, object, &oid, value).await;
        report(Verb::Add, &oid, result)
    }

    /// Delete an instance.
    pub async fn del(&mut self, group: GroupId, oid: &str) -> Result<()> {
        let (object, oid) = self.resolve(group, Verb::Del, oid)?;
        let result = self.dispatch_del(group, object, &oid).await;
        report(Verb::Del, &oid, result)
    }

    /// Instance names of an object, separated by single spaces.
    ///
    /// The OID names the object to list; its own instance name is ignored,
    /// the instances of its ancestors select the scope.
    pub async fn list(&mut self, group: GroupId, oid: &str) -> Result<String> {
        let (object, oid) = self.resolve(group, Verb::List, oid)?;
        let result = self.dispatch_list(object, &oid).await;
        let names = report(Verb::List, &oid, result)?;
        Ok(names.collect::<Vec<_>>().join(" "))
    }

    /// Apply staged changes of the nearest committable ancestor of `oid`.
    pub async fn commit(&mut self, group: GroupId, oid: &str) -> Result<()> {
        let mut oid: Oid = oid.parse()?;
        self.check_agent(&oid)?;
        let mut at = self.lookup(&oid)?;
        while !self.registry.node(at).caps.contains(Caps::COMMIT) {
            match self.registry.node(at).parent {
                Some(parent) if parent != Registry::ROOT => {
                    at = parent;
                    oid.segments.pop();
                }
                _ => {
                    return Err(Error::Unsupported(format!("commit on {}", oid)));
                }
            }
        }
        debug!(group, verb = %Verb::Commit, oid = %oid, "dispatch");

        let result = match self.registry.node(at).object {
            Object::Route => self.route_commit(group, oid.leaf()).await,
            other => Err(Error::Unsupported(format!("commit on {:?}", other))),
        };
        report(Verb::Commit, &oid, result)
    }

    /// Drop everything staged by `group` without applying it.
    pub fn abandon(&mut self, group: GroupId) -> usize {
        self.staged.abandon(group)
    }

    fn check_agent(&self, oid: &Oid) -> Result<()> {
        if oid.agent != self.config.name {
            return Err(Error::not_found(format!("agent {}", oid.agent)));
        }
        Ok(())
    }

    fn lookup(&self, oid: &Oid) -> Result<usize> {
        self.registry
            .find(&oid.sub_ids())
            .ok_or_else(|| Error::not_found(format!("object {}", oid)))
    }

    fn resolve(&self, group: GroupId, verb: Verb, oid: &str) -> Result<(Object, Oid)> {
        let oid: Oid = oid.parse()?;
        self.check_agent(&oid)?;
        let node = self.registry.node(self.lookup(&oid)?);
        if !node.caps.contains(verb.cap()) {
            return Err(Error::Unsupported(format!("{} on {}", verb, oid)));
        }
        debug!(group, verb = %verb, oid = %oid, "dispatch");
        Ok((node.object, oid))
    }
}

/// Log a failed request: backend failures at error level, request errors
/// at debug level.
fn report<T>(verb: Verb, oid: &Oid, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if e.kind() == ErrorKind::Backend {
            error!(verb = %verb, oid = %oid, error = %e, "backend call failed");
        } else {
            debug!(verb = %verb, oid = %oid, error = %e, "request failed");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::host::MemoryHost;

    fn agent() -> Agent<MemoryBackend, MemoryHost> {
        Agent::new(
            AgentConfig::default(),
            MemoryBackend::new(),
            MemoryHost::new().with_var("HOME", "/root"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_segment() {
        let mut agent = agent();
        let err = agent.get(1, "/agent:Agt_A/nosuch:x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_other_agent() {
        let mut agent = agent();
        let err = agent.get(1, "/agent:Agt_B/env:HOME").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_missing_capability() {
        let mut agent = agent();
        let err = agent
            .set(1, "/agent:Agt_A/interface:eth0/link_addr:", "00:11:22:33:44:55")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let err = agent.commit(1, "/agent:Agt_A/env:HOME").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn test_value_limit() {
        let mut agent = agent();
        agent
            .host_mut()
            .set_var("BIG", &"x".repeat(VALUE_LIMIT))
            .unwrap();
        let err = agent.get(1, "/agent:Agt_A/env:BIG").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BufferTooSmall);

        agent
            .host_mut()
            .set_var("BIG", &"x".repeat(VALUE_LIMIT - 1))
            .unwrap();
        assert_eq!(
            agent.get(1, "/agent:Agt_A/env:BIG").await.unwrap().len(),
            VALUE_LIMIT - 1
        );
    }

    #[tokio::test]
    async fn test_list_joins_with_spaces() {
        let mut agent = agent();
        assert_eq!(
            agent.list(1, "/agent:Agt_A/interface:").await.unwrap(),
            "lo eth0"
        );
    }
}
