//! Delivery of build lifecycle notifications to subscribed endpoints.
//!
//! Deliveries run concurrently under a semaphore bound, each with its own
//! timeout. One endpoint failing (or timing out) never affects deliveries to
//! the other endpoints; failures are logged and dropped. Only enrichment
//! failure aborts a dispatch, since every endpoint would receive the same
//! incomplete payload.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::config::WebhookSettings;
use super::registry::RegistryClient;
use crate::types::{BuildSpec, PackageName};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown webhook event: {0}")]
    UnknownEvent(String),

    #[error("registry enrichment failed for {pkg}: {source}")]
    Enrichment {
        pkg: PackageName,
        #[source]
        source: super::registry::RegistryError,
    },
}

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Lifecycle transitions that subscribers are notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEvent {
    BuildStarted,
    BuildCompleted,
}

impl WebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::BuildStarted => "build_started",
            WebhookEvent::BuildCompleted => "build_completed",
        }
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WebhookEvent {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "build_started" => Ok(WebhookEvent::BuildStarted),
            "build_completed" => Ok(WebhookEvent::BuildCompleted),
            other => Err(DispatchError::UnknownEvent(other.to_string())),
        }
    }
}

/// Payload POSTed to each subscribed endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub event: WebhookEvent,
    pub pkg: PackageName,
    pub version: String,
    pub env: crate::types::Environment,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<serde_json::Value>,
}

pub struct WebhookDispatcher {
    subscriptions: std::collections::BTreeMap<PackageName, Vec<String>>,
    client: reqwest::Client,
    limiter: Arc<Semaphore>,
    timeout: Duration,
    registry: Option<Arc<dyn RegistryClient>>,
}

impl WebhookDispatcher {
    pub fn new(settings: &WebhookSettings, registry: Option<Arc<dyn RegistryClient>>) -> Self {
        WebhookDispatcher {
            subscriptions: settings.subscriptions(),
            client: reqwest::Client::new(),
            limiter: Arc::new(Semaphore::new(settings.concurrency.max(1))),
            timeout: Duration::from_millis(settings.timeout_ms),
            registry,
        }
    }

    /// Notifies every endpoint subscribed to the spec's package, waiting for
    /// all deliveries to finish. Per-endpoint failures are logged, never
    /// returned.
    pub async fn dispatch(&self, event: WebhookEvent, spec: &BuildSpec) -> Result<()> {
        let Some(urls) = self.subscriptions.get(&spec.pkg) else {
            info!(pkg = %spec.pkg, event = %event, "no webhook subscribers");
            return Ok(());
        };

        let repository = match &self.registry {
            Some(registry) => {
                registry
                    .repository(&spec.pkg)
                    .await
                    .map_err(|source| DispatchError::Enrichment {
                        pkg: spec.pkg.clone(),
                        source,
                    })?
            }
            None => None,
        };

        let notification = Notification {
            event,
            pkg: spec.pkg.clone(),
            version: spec.version.clone(),
            env: spec.env,
            repository,
        };

        let mut deliveries = Vec::with_capacity(urls.len());
        for url in urls {
            let permit = match self.limiter.clone().acquire_owned().await {
                Ok(permit) => permit,
                // Closed only at shutdown; remaining deliveries are dropped.
                Err(_) => break,
            };
            let client = self.client.clone();
            let url = url.clone();
            let timeout = self.timeout;
            let notification = notification.clone();

            deliveries.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = client
                    .post(&url)
                    .timeout(timeout)
                    .json(&notification)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status);
                match outcome {
                    Ok(_) => {
                        info!(url = %url, event = %notification.event, "webhook delivered");
                    }
                    Err(error) => {
                        warn!(url = %url, event = %notification.event, %error, "webhook delivery failed");
                    }
                }
            }));
        }

        for delivery in deliveries {
            // Delivery tasks never panic; a join error still shouldn't fail
            // the dispatch.
            let _ = delivery.await;
        }

        Ok(())
    }
}

/// Fires a dispatch on a detached task so callers never block on delivery.
/// Dispatch errors are logged here and go no further.
pub fn dispatch_detached(
    dispatcher: Arc<WebhookDispatcher>,
    event: WebhookEvent,
    spec: BuildSpec,
) {
    tokio::spawn(async move {
        if let Err(error) = dispatcher.dispatch(event, &spec).await {
            warn!(pkg = %spec.pkg, event = %event, %error, "webhook dispatch failed");
        }
    });
}
