//! In-memory [`StatusStore`] backed by `tokio::sync::RwLock`ed maps.
//!
//! Suitable for single-process deployments and tests. Writes take the lock
//! for the whole read-modify-write, so the conditional-create contract holds
//! without further coordination.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    HeadPatch, ReadMode, Result, Status, StatusCounter, StatusEvent, StatusHead, StatusPatch,
    StatusStore,
};
use crate::types::{BuildSpec, Environment, PackageName};

type HeadKey = (PackageName, Environment);

#[derive(Debug, Default)]
struct Collections {
    statuses: HashMap<BuildSpec, Status>,
    heads: HashMap<HeadKey, StatusHead>,
    events: HashMap<BuildSpec, Vec<StatusEvent>>,
    counters: HashMap<BuildSpec, u64>,
}

#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    inner: RwLock<Collections>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn find_status(&self, spec: &BuildSpec, _mode: ReadMode) -> Result<Option<Status>> {
        let inner = self.inner.read().await;
        Ok(inner.statuses.get(spec).cloned())
    }

    async fn find_head(
        &self,
        pkg: &PackageName,
        env: Environment,
        _mode: ReadMode,
    ) -> Result<Option<StatusHead>> {
        let inner = self.inner.read().await;
        Ok(inner.heads.get(&(pkg.clone(), env)).cloned())
    }

    async fn find_counter(&self, spec: &BuildSpec) -> Result<Option<StatusCounter>> {
        let inner = self.inner.read().await;
        Ok(inner.counters.get(spec).map(|&count| StatusCounter {
            spec: spec.clone(),
            count,
        }))
    }

    async fn list_events(&self, spec: &BuildSpec) -> Result<Vec<StatusEvent>> {
        let inner = self.inner.read().await;
        Ok(inner.events.get(spec).cloned().unwrap_or_default())
    }

    async fn append_event(&self, event: StatusEvent) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .events
            .entry(event.spec.clone())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn create_status_if_absent(&self, status: Status) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.statuses.contains_key(&status.spec) {
            return Ok(false);
        }
        inner.statuses.insert(status.spec.clone(), status);
        Ok(true)
    }

    async fn put_head(&self, head: StatusHead) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.heads.insert((head.pkg.clone(), head.env), head);
        Ok(())
    }

    async fn update_status(&self, spec: &BuildSpec, patch: StatusPatch) -> Result<()> {
        let mut inner = self.inner.write().await;
        let status = inner
            .statuses
            .entry(spec.clone())
            .or_insert_with(|| Status::new(spec.clone(), None));
        status.apply(&patch);
        Ok(())
    }

    async fn update_head(
        &self,
        pkg: &PackageName,
        env: Environment,
        patch: HeadPatch,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.heads.entry((pkg.clone(), env)) {
            Entry::Occupied(mut entry) => {
                let head = entry.get_mut();
                head.version = patch.version;
                if patch.total.is_some() {
                    head.total = patch.total;
                }
                head.updated_at = chrono::Utc::now();
            }
            Entry::Vacant(entry) => {
                entry.insert(StatusHead {
                    pkg: pkg.clone(),
                    env,
                    version: patch.version,
                    previous_version: None,
                    total: patch.total,
                    updated_at: chrono::Utc::now(),
                });
            }
        }
        Ok(())
    }

    async fn increment_counter(&self, spec: &BuildSpec, by: u64) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let count = inner.counters.entry(spec.clone()).or_insert(0);
        *count += by;
        Ok(*count)
    }

    async fn decrement_counter(&self, spec: &BuildSpec, by: u64) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let count = inner.counters.entry(spec.clone()).or_insert(0);
        *count = count.saturating_sub(by);
        Ok(*count)
    }

    async fn remove_status(&self, spec: &BuildSpec) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.statuses.remove(spec);
        Ok(())
    }

    async fn remove_head(&self, pkg: &PackageName, env: Environment) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.heads.remove(&(pkg.clone(), env));
        Ok(())
    }

    async fn remove_events(&self, spec: &BuildSpec) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.events.remove(spec);
        Ok(())
    }

    async fn remove_counter(&self, spec: &BuildSpec) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.counters.remove(spec);
        Ok(())
    }
}
