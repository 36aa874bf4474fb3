//! Record shapes for the four status collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BuildSpec, Environment, EventId, PackageName};

/// Current aggregate record for one build spec.
///
/// Created at most once per spec (by the first `event` message), then updated
/// in place by later transitions. `previous_version` is captured at creation
/// from the head pointer and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(flatten)]
    pub spec: BuildSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,

    /// Declared total number of build units, unset until a `queued` message
    /// reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    /// Sticky error flag: set by `error` messages, cleared only by a
    /// completing build.
    pub error: bool,

    pub complete: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Status {
    /// Creates a fresh, incomplete status for a spec.
    pub fn new(spec: BuildSpec, previous_version: Option<String>) -> Self {
        let now = Utc::now();
        Status {
            spec,
            previous_version,
            total: None,
            error: false,
            complete: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update, bumping `updated_at`.
    pub fn apply(&mut self, patch: &StatusPatch) {
        if let Some(total) = patch.total {
            self.total = Some(total);
        }
        if let Some(error) = patch.error {
            self.error = error;
        }
        if let Some(complete) = patch.complete {
            self.complete = complete;
        }
        self.updated_at = Utc::now();
    }

    /// Projects this status into its head-pointer shape, which excludes the
    /// completion and error fields.
    pub fn head(&self) -> StatusHead {
        StatusHead {
            pkg: self.spec.pkg.clone(),
            env: self.spec.env,
            version: self.spec.version.clone(),
            previous_version: self.previous_version.clone(),
            total: self.total,
            updated_at: self.updated_at,
        }
    }
}

/// Partial update for a [`Status`] row. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPatch {
    pub total: Option<u32>,
    pub error: Option<bool>,
    pub complete: Option<bool>,
}

/// Pointer record per (pkg, env): the most recently known version and a
/// projection of its status without the completion/error fields.
///
/// Used to resolve "latest version" when a caller does not specify one, and
/// to supply `previous_version` for a newly created [`Status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHead {
    pub pkg: PackageName,
    pub env: Environment,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    pub updated_at: DateTime<Utc>,
}

/// Partial update for a [`StatusHead`] row: advances the version and merges
/// the declared total when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadPatch {
    pub version: String,
    pub total: Option<u32>,
}

/// Append-only log entry for a spec. Immutable once written; entries form
/// the audit trail for a build, ordered by write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    #[serde(flatten)]
    pub spec: BuildSpec,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    pub error: bool,

    pub event_id: EventId,

    pub created_at: DateTime<Utc>,
}

/// Monotonically incremented counter of completed build units for a spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounter {
    #[serde(flatten)]
    pub spec: BuildSpec,

    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> BuildSpec {
        BuildSpec::new("whatever", Environment::Dev, "1.0.0")
    }

    #[test]
    fn new_status_is_incomplete() {
        let status = Status::new(spec(), None);
        assert!(!status.complete);
        assert!(!status.error);
        assert!(status.total.is_none());
        assert!(status.previous_version.is_none());
    }

    #[test]
    fn apply_merges_only_set_fields() {
        let mut status = Status::new(spec(), Some("0.9.0".to_string()));
        status.apply(&StatusPatch {
            total: Some(4),
            ..Default::default()
        });

        assert_eq!(status.total, Some(4));
        assert!(!status.error);
        assert!(!status.complete);
        assert_eq!(status.previous_version.as_deref(), Some("0.9.0"));

        status.apply(&StatusPatch {
            complete: Some(true),
            error: Some(false),
            ..Default::default()
        });
        assert!(status.complete);
        assert_eq!(status.total, Some(4));
    }

    #[test]
    fn head_projection_excludes_completion_fields() {
        let mut status = Status::new(spec(), Some("0.9.0".to_string()));
        status.apply(&StatusPatch {
            total: Some(2),
            error: Some(true),
            complete: Some(true),
        });

        let head = status.head();
        assert_eq!(head.pkg, status.spec.pkg);
        assert_eq!(head.version, status.spec.version);
        assert_eq!(head.previous_version.as_deref(), Some("0.9.0"));
        assert_eq!(head.total, Some(2));

        let json = serde_json::to_value(&head).unwrap();
        assert!(json.get("complete").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn status_serde_flattens_spec() {
        let status = Status::new(spec(), None);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["pkg"], "whatever");
        assert_eq!(json["env"], "dev");
        assert_eq!(json["version"], "1.0.0");
    }
}
