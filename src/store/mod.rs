//! Persistence port for status records.
//!
//! The service keeps four collections: the per-spec [`Status`] aggregate, a
//! per-(pkg, env) [`StatusHead`] pointer, an append-only [`StatusEvent`] log
//! and a completed-unit [`StatusCounter`]. [`StatusStore`] is the trait the
//! rest of the crate programs against; [`InMemoryStatusStore`] is the default
//! backing implementation.

mod memory;
mod records;

pub use memory::InMemoryStatusStore;
pub use records::{HeadPatch, Status, StatusCounter, StatusEvent, StatusHead, StatusPatch};

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{BuildSpec, Environment, PackageName};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("storage backend rejected the operation: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Read consistency requested for a lookup.
///
/// Reads that feed a subsequent conditional write (status creation, head
/// advancement) need [`ReadMode::Strong`]; display-only reads take the
/// cheaper default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    #[default]
    Eventual,
    Strong,
}

/// Storage operations over the four status collections.
///
/// Implementations must make [`create_status_if_absent`] atomic with respect
/// to concurrent creations for the same spec: exactly one caller observes
/// `true`.
///
/// [`create_status_if_absent`]: StatusStore::create_status_if_absent
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn find_status(&self, spec: &BuildSpec, mode: ReadMode) -> Result<Option<Status>>;

    async fn find_head(
        &self,
        pkg: &PackageName,
        env: Environment,
        mode: ReadMode,
    ) -> Result<Option<StatusHead>>;

    async fn find_counter(&self, spec: &BuildSpec) -> Result<Option<StatusCounter>>;

    /// Lists the event log for a spec in write order.
    async fn list_events(&self, spec: &BuildSpec) -> Result<Vec<StatusEvent>>;

    async fn append_event(&self, event: StatusEvent) -> Result<()>;

    /// Inserts the status only if no row exists for its spec yet. Returns
    /// whether this call performed the insert.
    async fn create_status_if_absent(&self, status: Status) -> Result<bool>;

    /// Unconditionally writes the head pointer for the status's (pkg, env).
    async fn put_head(&self, head: StatusHead) -> Result<()>;

    /// Merges a patch into the status row for `spec`, creating the row if it
    /// does not exist yet.
    async fn update_status(&self, spec: &BuildSpec, patch: StatusPatch) -> Result<()>;

    /// Merges a patch into the head pointer for (pkg, env), creating it if it
    /// does not exist yet.
    async fn update_head(
        &self,
        pkg: &PackageName,
        env: Environment,
        patch: HeadPatch,
    ) -> Result<()>;

    /// Adds `by` to the completed-unit counter for `spec`, creating it at
    /// zero first if needed. Returns the new count.
    async fn increment_counter(&self, spec: &BuildSpec, by: u64) -> Result<u64>;

    /// Subtracts `by` from the counter, saturating at zero. Returns the new
    /// count.
    async fn decrement_counter(&self, spec: &BuildSpec, by: u64) -> Result<u64>;

    async fn remove_status(&self, spec: &BuildSpec) -> Result<()>;

    async fn remove_head(&self, pkg: &PackageName, env: Environment) -> Result<()>;

    async fn remove_events(&self, spec: &BuildSpec) -> Result<()>;

    async fn remove_counter(&self, spec: &BuildSpec) -> Result<()>;
}
