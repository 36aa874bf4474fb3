//! Translation of raw queue messages into store records.
//!
//! Handlers never build [`Status`]/[`StatusEvent`] rows by hand; they ask
//! [`transform`] (or one of the typed helpers) for the record shape a message
//! implies. Every call that produces an event row mints a fresh [`EventId`],
//! so re-delivered messages land as distinct log entries.

use chrono::Utc;
use thiserror::Error;

use crate::message::QueueMessage;
use crate::store::{StatusEvent, StatusPatch};
use crate::types::{BuildSpec, EventId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// The message carried neither `pkg` nor `name`.
    #[error("message has no package name (version {version}, env {env})")]
    MissingPackage { version: String, env: String },
}

pub type Result<T> = std::result::Result<T, NormalizeError>;

/// Which record shape to derive from a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Status,
    Error,
    Event,
    Counter,
}

/// A store-ready record derived from one queue message.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedRecord {
    Status { spec: BuildSpec, patch: StatusPatch },
    Event(StatusEvent),
    Counter(BuildSpec),
}

/// Derives the record of the requested kind from a message.
///
/// `RecordKind::Error` is an event row with the error flag forced on, which
/// is how error messages reach the log even when the publisher omitted the
/// flag.
pub fn transform(msg: &QueueMessage, kind: RecordKind) -> Result<NormalizedRecord> {
    let spec = spec_key(msg)?;
    Ok(match kind {
        RecordKind::Status => NormalizedRecord::Status {
            spec,
            patch: status_patch(msg),
        },
        RecordKind::Event => NormalizedRecord::Event(event_row(msg, spec, false)),
        RecordKind::Error => NormalizedRecord::Event(event_row(msg, spec, true)),
        RecordKind::Counter => NormalizedRecord::Counter(spec),
    })
}

/// The spec key a message addresses, or an error if no package is named.
pub fn spec_key(msg: &QueueMessage) -> Result<BuildSpec> {
    msg.spec().ok_or_else(|| NormalizeError::MissingPackage {
        version: msg.version.clone(),
        env: msg.env.to_string(),
    })
}

/// An event log row for a message. `force_error` overrides the message's own
/// error flag.
pub fn event_record(msg: &QueueMessage, force_error: bool) -> Result<StatusEvent> {
    let spec = spec_key(msg)?;
    Ok(event_row(msg, spec, force_error))
}

/// The status fields a message sets. Only truthy values carry over: an
/// `error: false` on the wire must not clear the sticky error flag, and a
/// zero total is treated as undeclared.
pub fn status_patch(msg: &QueueMessage) -> StatusPatch {
    StatusPatch {
        total: msg.total.filter(|&total| total != 0),
        error: msg.error.filter(|&error| error),
        complete: None,
    }
}

fn event_row(msg: &QueueMessage, spec: BuildSpec, force_error: bool) -> StatusEvent {
    StatusEvent {
        spec,
        message: msg.message.clone().unwrap_or_default(),
        details: msg.details.clone(),
        locale: msg.locale.clone(),
        error: force_error || msg.error.unwrap_or(false),
        event_id: EventId::generate(),
        created_at: Utc::now(),
    }
}
