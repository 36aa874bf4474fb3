//! Build status transition handling.
//!
//! [`StatusHandler::handle`] is the single entry point for queue messages: it
//! routes on the message's declared type and applies the corresponding
//! transition to the status collections. Unknown types are logged and
//! skipped so one bad publisher cannot wedge the stream.

use std::sync::Arc;

use thiserror::Error;
use tokio::try_join;
use tracing::{debug, info, instrument, warn};

use crate::message::{EventType, QueueMessage};
use crate::normalize::{self, NormalizeError};
use crate::progress::ProgressCalculator;
use crate::store::{ReadMode, Status, StatusPatch, StatusStore, StoreError};
use crate::webhook::{dispatch_detached, WebhookDispatcher, WebhookEvent};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, HandlerError>;

/// Applies queue messages to the status collections and fires webhooks at
/// build start and completion.
pub struct StatusHandler {
    store: Arc<dyn StatusStore>,
    progress: ProgressCalculator,
    webhooks: Arc<WebhookDispatcher>,
}

impl StatusHandler {
    pub fn new(store: Arc<dyn StatusStore>, webhooks: Arc<WebhookDispatcher>) -> Self {
        let progress = ProgressCalculator::new(store.clone());
        StatusHandler {
            store,
            progress,
            webhooks,
        }
    }

    /// Routes one message to its transition. Unknown event types are not an
    /// error: they are logged and the message is dropped.
    #[instrument(skip_all, fields(event_type = %msg.event_type, version = %msg.version, env = %msg.env))]
    pub async fn handle(&self, msg: &QueueMessage) -> Result<()> {
        let Some(event_type) = EventType::from_tag(&msg.event_type) else {
            warn!("unknown event type, skipping message");
            return Ok(());
        };

        match event_type {
            EventType::Event => self.event(msg).await,
            EventType::Queued => self.queued(msg).await,
            EventType::Error => self.error(msg).await,
            EventType::Complete => self.complete(msg).await,
            EventType::Ignored => {
                info!("build ignored");
                Ok(())
            }
        }
    }

    /// Records an informational event. The first event for a spec also
    /// creates the status row (capturing the previous version from the head
    /// pointer) and, having won the creation race, advances the head.
    async fn event(&self, msg: &QueueMessage) -> Result<()> {
        let spec = normalize::spec_key(msg)?;
        let event = normalize::event_record(msg, false)?;

        let (_, head, existing) = try_join!(
            async { self.store.append_event(event).await.map_err(HandlerError::from) },
            async {
                self.store
                    .find_head(&spec.pkg, spec.env, ReadMode::Strong)
                    .await
                    .map_err(HandlerError::from)
            },
            async {
                self.store
                    .find_status(&spec, ReadMode::Strong)
                    .await
                    .map_err(HandlerError::from)
            },
        )?;

        let had_head = head.is_some();

        if let Some(existing) = existing {
            debug!(spec = %spec, "status already exists");
            // An upsert (`queued`/`error` racing the first `event`) creates
            // the status row without a head; fill the head in here.
            if !had_head {
                self.repair_missing_head(&existing).await?;
            }
            return Ok(());
        }

        let previous_version = head.and_then(|head| {
            if head.version == spec.version {
                head.previous_version
            } else {
                Some(head.version)
            }
        });

        let mut status = Status::new(spec.clone(), previous_version);
        status.apply(&normalize::status_patch(msg));

        // Only the creation winner writes the head alongside the status.
        if self.store.create_status_if_absent(status.clone()).await? {
            info!(spec = %spec, "status created");
            self.store.put_head(status.head()).await?;
        } else if !had_head {
            // Lost to a concurrent upsert, which never writes heads.
            self.repair_missing_head(&status).await?;
        }

        Ok(())
    }

    /// Writes the head projection for a status whose (pkg, env) has no head
    /// pointer yet. Re-checks first so a concurrent creation winner's head
    /// is not clobbered.
    async fn repair_missing_head(&self, status: &Status) -> Result<()> {
        let current = self
            .store
            .find_head(&status.spec.pkg, status.spec.env, ReadMode::Strong)
            .await?;
        if current.is_none() {
            self.store.put_head(status.head()).await?;
        }
        Ok(())
    }

    /// Records that builds were queued: notifies subscribers that the build
    /// started, stores the declared total, advances the head pointer and
    /// runs the `event` transition for the log entry.
    async fn queued(&self, msg: &QueueMessage) -> Result<()> {
        let spec = normalize::spec_key(msg)?;
        let patch = normalize::status_patch(msg);

        dispatch_detached(self.webhooks.clone(), WebhookEvent::BuildStarted, spec.clone());

        try_join!(
            async {
                self.store
                    .update_status(&spec, patch.clone())
                    .await
                    .map_err(HandlerError::from)
            },
            async {
                self.store
                    .update_head(
                        &spec.pkg,
                        spec.env,
                        crate::store::HeadPatch {
                            version: spec.version.clone(),
                            total: msg.total,
                        },
                    )
                    .await
                    .map_err(HandlerError::from)
            },
            self.event(msg),
        )?;

        Ok(())
    }

    /// Records a build error: runs the `event` transition with the error
    /// flag forced on and sets the sticky error flag on the status row.
    async fn error(&self, msg: &QueueMessage) -> Result<()> {
        let spec = normalize::spec_key(msg)?;
        let mut flagged = msg.clone();
        flagged.error = Some(true);

        try_join!(
            self.event(&flagged),
            async {
                self.store
                    .update_status(
                        &spec,
                        StatusPatch {
                            error: Some(true),
                            ..Default::default()
                        },
                    )
                    .await
                    .map_err(HandlerError::from)
            },
        )?;

        Ok(())
    }

    /// Records one completed build unit. When the last declared unit lands,
    /// marks the status complete (clearing the error flag) and notifies
    /// subscribers.
    async fn complete(&self, msg: &QueueMessage) -> Result<()> {
        let spec = normalize::spec_key(msg)?;
        let event = normalize::event_record(msg, false)?;

        let (count, _) = try_join!(
            async {
                self.store
                    .increment_counter(&spec, 1)
                    .await
                    .map_err(HandlerError::from)
            },
            async { self.store.append_event(event).await.map_err(HandlerError::from) },
        )?;

        let progress = self.progress.compute(&spec).await?;
        debug!(spec = %spec, count, progress = progress.progress, "build unit completed");

        if progress.is_complete() {
            info!(spec = %spec, "build complete");
            dispatch_detached(
                self.webhooks.clone(),
                WebhookEvent::BuildCompleted,
                spec.clone(),
            );
            self.store
                .update_status(
                    &spec,
                    StatusPatch {
                        complete: Some(true),
                        error: Some(false),
                        ..Default::default()
                    },
                )
                .await?;
        }

        Ok(())
    }
}
