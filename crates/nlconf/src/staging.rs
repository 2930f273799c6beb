//! Staged object store.
//!
//! Attribute writes on staged objects (route metric, mtu, window, irtt, flags)
//! accumulate here and reach the OS only on commit, as a single create,
//! replace or delete. There is at most one entry per (type, instance).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::warn;

use crate::error::{Error, Result};

/// Identifies the RPC session that staged an object.
pub type GroupId = u32;

/// Object types that support staged updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Route,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Route => f.write_str("route"),
        }
    }
}

/// What commit does with a staged object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedAction {
    /// Create the object from the staged attributes.
    Create,
    /// Replace the live object with the staged attributes.
    Set,
    /// Delete the live object.
    Delete,
}

/// One pending change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedObject {
    pub kind: ObjectType,
    pub instance: String,
    pub group: GroupId,
    pub action: StagedAction,
    /// Attribute name to pending value.
    pub attrs: BTreeMap<String, String>,
}

impl StagedObject {
    fn new(kind: ObjectType, instance: &str, group: GroupId, action: StagedAction) -> Self {
        Self {
            kind,
            instance: instance.to_owned(),
            group,
            action,
            attrs: BTreeMap::new(),
        }
    }

    /// Pending value of `attr`.
    pub fn attr(&self, attr: &str) -> Option<&str> {
        self.attrs.get(attr).map(String::as_str)
    }
}

/// Scratch table of pending changes, owned by the dispatcher.
#[derive(Debug, Default)]
pub struct StagedStore {
    objects: HashMap<(ObjectType, String), StagedObject>,
}

impl StagedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Look up a staged object.
    pub fn get(&self, kind: ObjectType, instance: &str) -> Option<&StagedObject> {
        self.objects.get(&(kind, instance.to_owned()))
    }

    /// Stage `attr = value`, creating a Set entry if none exists.
    pub(crate) fn stage_set(
        &mut self,
        kind: ObjectType,
        instance: &str,
        group: GroupId,
        attr: &str,
        value: &str,
    ) {
        let obj = self
            .objects
            .entry((kind, instance.to_owned()))
            .or_insert_with(|| StagedObject::new(kind, instance, group, StagedAction::Set));
        obj.attrs.insert(attr.to_owned(), value.to_owned());
    }

    /// Stage `attr = value`. When the entry is created, `loader` runs first
    /// to seed it with the live attributes; a loader error stores nothing.
    pub async fn stage_set_with<F>(
        &mut self,
        kind: ObjectType,
        instance: &str,
        group: GroupId,
        attr: &str,
        value: &str,
        loader: F,
    ) -> Result<()>
    where
        F: AsyncFnOnce() -> Result<Vec<(String, String)>>,
    {
        let key = (kind, instance.to_owned());
        if !self.objects.contains_key(&key) {
            let live = loader().await?;
            let mut obj = StagedObject::new(kind, instance, group, StagedAction::Set);
            obj.attrs.extend(live);
            self.objects.insert(key.clone(), obj);
        }
        if let Some(obj) = self.objects.get_mut(&key) {
            obj.attrs.insert(attr.to_owned(), value.to_owned());
        }
        Ok(())
    }

    /// Stage creation of a new object.
    pub fn stage_add(&mut self, kind: ObjectType, instance: &str, group: GroupId) -> Result<()> {
        let key = (kind, instance.to_owned());
        if self.objects.contains_key(&key) {
            return Err(Error::exists(format!("staged {} {}", kind, instance)));
        }
        self.objects.insert(
            key,
            StagedObject::new(kind, instance, group, StagedAction::Create),
        );
        Ok(())
    }

    /// Stage deletion, discarding any pending attribute edits.
    pub fn stage_delete(&mut self, kind: ObjectType, instance: &str, group: GroupId) {
        let obj = self
            .objects
            .entry((kind, instance.to_owned()))
            .or_insert_with(|| StagedObject::new(kind, instance, group, StagedAction::Delete));
        obj.action = StagedAction::Delete;
        obj.attrs.clear();
    }

    /// Remove and return a staged object.
    pub fn take(&mut self, kind: ObjectType, instance: &str) -> Option<StagedObject> {
        self.objects.remove(&(kind, instance.to_owned()))
    }

    /// Apply the staged object, if any.
    ///
    /// The entry is removed before `apply` runs, so it is gone whether the
    /// backend call succeeds or fails. Committing with nothing staged is a
    /// no-op, and so is committing an entry staged by another group; that
    /// entry stays for its owner.
    pub async fn commit<F>(
        &mut self,
        kind: ObjectType,
        instance: &str,
        group: GroupId,
        apply: F,
    ) -> Result<()>
    where
        F: AsyncFnOnce(StagedObject) -> Result<()>,
    {
        match self.get(kind, instance) {
            None => {
                warn!("commit of {} {}: nothing staged", kind, instance);
                return Ok(());
            }
            Some(obj) if obj.group != group => {
                warn!(
                    "commit of {} {} from group {} ignored: staged by group {}",
                    kind, instance, group, obj.group
                );
                return Ok(());
            }
            Some(_) => {}
        }
        match self.take(kind, instance) {
            Some(obj) => apply(obj).await,
            None => Ok(()),
        }
    }

    /// Drop every object staged by `group`. Returns how many were dropped.
    pub fn abandon(&mut self, group: GroupId) -> usize {
        let before = self.objects.len();
        self.objects.retain(|_, obj| obj.group != group);
        let dropped = before - self.objects.len();
        if dropped > 0 {
            warn!("abandoned {} staged object(s) of group {}", dropped, group);
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const ROUTE: &str = "10.1.0.0|16,gw=10.0.0.1";

    #[test]
    fn test_set_creates_set_entry() {
        let mut store = StagedStore::new();
        store.stage_set(ObjectType::Route, ROUTE, 1, "metric", "5");
        store.stage_set(ObjectType::Route, ROUTE, 1, "metric", "7");

        let obj = store.get(ObjectType::Route, ROUTE).unwrap();
        assert_eq!(obj.action, StagedAction::Set);
        assert_eq!(obj.attr("metric"), Some("7"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_twice_fails() {
        let mut store = StagedStore::new();
        store.stage_add(ObjectType::Route, ROUTE, 1).unwrap();
        let err = store.stage_add(ObjectType::Route, ROUTE, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        store.stage_set(ObjectType::Route, ROUTE, 1, "mtu", "1400");
        let obj = store.get(ObjectType::Route, ROUTE).unwrap();
        assert_eq!(obj.action, StagedAction::Create);
    }

    #[test]
    fn test_delete_discards_edits() {
        let mut store = StagedStore::new();
        store.stage_set(ObjectType::Route, ROUTE, 1, "metric", "5");
        store.stage_delete(ObjectType::Route, ROUTE, 1);

        let obj = store.get(ObjectType::Route, ROUTE).unwrap();
        assert_eq!(obj.action, StagedAction::Delete);
        assert!(obj.attrs.is_empty());
    }

    #[tokio::test]
    async fn test_loader_runs_once() {
        let mut store = StagedStore::new();
        let mut calls = 0;

        store
            .stage_set_with(ObjectType::Route, ROUTE, 1, "metric", "9", async || {
                calls += 1;
                Ok(vec![
                    ("metric".to_owned(), "1".to_owned()),
                    ("mtu".to_owned(), "1500".to_owned()),
                ])
            })
            .await
            .unwrap();
        store
            .stage_set_with(ObjectType::Route, ROUTE, 1, "win", "8", async || {
                calls += 1;
                Ok(Vec::new())
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
        let obj = store.get(ObjectType::Route, ROUTE).unwrap();
        assert_eq!(obj.attr("metric"), Some("9"));
        assert_eq!(obj.attr("mtu"), Some("1500"));
        assert_eq!(obj.attr("win"), Some("8"));
    }

    #[tokio::test]
    async fn test_loader_error_stores_nothing() {
        let mut store = StagedStore::new();
        let err = store
            .stage_set_with(ObjectType::Route, ROUTE, 1, "metric", "9", async || {
                Err(Error::not_found("route"))
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_commit_consumes_entry_even_on_failure() {
        let mut store = StagedStore::new();
        store.stage_set(ObjectType::Route, ROUTE, 1, "metric", "5");

        let err = store
            .commit(ObjectType::Route, ROUTE, 1, async |obj| {
                assert_eq!(obj.attr("metric"), Some("5"));
                Err(Error::from_errno(libc::EINVAL))
            })
            .await
            .unwrap_err();
        assert_eq!(err.errno(), Some(libc::EINVAL));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_commit_without_entry_is_noop() {
        let mut store = StagedStore::new();
        let mut applied = false;
        store
            .commit(ObjectType::Route, ROUTE, 1, async |_| {
                applied = true;
                Ok(())
            })
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn test_commit_from_other_group_keeps_entry() {
        let mut store = StagedStore::new();
        store.stage_set(ObjectType::Route, ROUTE, 1, "metric", "5");

        let mut applied = false;
        store
            .commit(ObjectType::Route, ROUTE, 2, async |_| {
                applied = true;
                Ok(())
            })
            .await
            .unwrap();
        assert!(!applied);
        assert_eq!(store.get(ObjectType::Route, ROUTE).unwrap().group, 1);

        store
            .commit(ObjectType::Route, ROUTE, 1, async |obj| {
                assert_eq!(obj.attr("metric"), Some("5"));
                applied = true;
                Ok(())
            })
            .await
            .unwrap();
        assert!(applied);
        assert!(store.is_empty());
    }

    #[test]
    fn test_abandon_drops_only_group() {
        let mut store = StagedStore::new();
        store.stage_add(ObjectType::Route, "10.1.0.0|16", 1).unwrap();
        store.stage_add(ObjectType::Route, "10.2.0.0|16", 1).unwrap();
        store.stage_add(ObjectType::Route, "10.3.0.0|16", 2).unwrap();

        assert_eq!(store.abandon(1), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(ObjectType::Route, "10.3.0.0|16").is_some());
        assert_eq!(store.abandon(1), 0);
    }
}
