//! Inbound queue message shapes.
//!
//! The upstream queue delivers loosely-typed JSON objects describing build
//! lifecycle transitions. [`QueueMessage`] captures that wire shape verbatim;
//! [`EventType`] is the explicit operation tag parsed from the message's
//! declared type, with unknown tags surfacing as `None` so the router can
//! log-and-skip instead of aborting the stream.

use serde::{Deserialize, Serialize};

use crate::types::{BuildSpec, Environment, PackageName};

/// A raw message from the upstream build queue.
///
/// The package name may arrive under either `pkg` or the legacy `name` field;
/// [`QueueMessage::package`] resolves primary-or-fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Declared operation tag. Kept as a raw string so unrecognized types can
    /// be reported instead of failing deserialization.
    #[serde(rename = "eventType")]
    pub event_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkg: Option<String>,

    /// Legacy alias for `pkg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub version: String,

    pub env: Environment,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Declared total number of build units, present on `queued` messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl QueueMessage {
    /// Resolves the package name: `pkg` first, `name` as fallback.
    pub fn package(&self) -> Option<&str> {
        self.pkg.as_deref().or(self.name.as_deref())
    }

    /// Builds the spec key for this message, if a package name is present.
    pub fn spec(&self) -> Option<BuildSpec> {
        self.package()
            .map(|pkg| BuildSpec::new(PackageName::new(pkg), self.env, self.version.clone()))
    }
}

/// The five known build lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Event,
    Queued,
    Error,
    Complete,
    Ignored,
}

impl EventType {
    /// Maps a declared message type to its operation, `None` for unknown tags.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "event" => Some(EventType::Event),
            "queued" => Some(EventType::Queued),
            "error" => Some(EventType::Error),
            "complete" => Some(EventType::Complete),
            "ignored" => Some(EventType::Ignored),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Event => "event",
            EventType::Queued => "queued",
            EventType::Error => "error",
            EventType::Complete => "complete",
            EventType::Ignored => "ignored",
        }
    }
}
