//! Build progress derivation.
//!
//! Progress is not stored anywhere; it is computed on demand from the status
//! row's declared total and the completed-unit counter.

use std::sync::Arc;

use serde::Serialize;
use tokio::try_join;

use crate::store::{ReadMode, StatusStore};
use crate::types::BuildSpec;

/// Point-in-time progress for one build spec.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    /// Completion percentage in `[0, 100]`.
    pub progress: f64,
    /// Build units completed so far.
    pub count: u64,
    /// Declared total build units; zero when no `queued` message arrived yet.
    pub total: u32,
}

impl Progress {
    /// Whether every declared unit has completed. A build with no declared
    /// total is never complete.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.progress >= 100.0
    }
}

/// Computes [`Progress`] from the status and counter rows.
#[derive(Clone)]
pub struct ProgressCalculator {
    store: Arc<dyn StatusStore>,
}

impl ProgressCalculator {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        ProgressCalculator { store }
    }

    /// Derives current progress for a spec. Missing rows count as zero, so
    /// asking about a spec nothing has been recorded for yields 0%.
    pub async fn compute(&self, spec: &BuildSpec) -> crate::store::Result<Progress> {
        let (status, counter) = try_join!(
            self.store.find_status(spec, ReadMode::Strong),
            self.store.find_counter(spec),
        )?;

        let total = status.and_then(|s| s.total).unwrap_or(0);
        let count = counter.map(|c| c.count).unwrap_or(0);

        Ok(Progress {
            progress: percentage(count, total),
            count,
            total,
        })
    }
}

/// `count / total` as a percentage, clamped to `[0, 100]`. An undeclared
/// total (zero) reads as no progress rather than dividing by zero.
fn percentage(count: u64, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 100.0).min(100.0)
}
