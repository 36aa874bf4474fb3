//! HTTP surface: read endpoints over the status collections plus a message
//! ingest route for deployments without a queue in front.

mod health;
mod status;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::mpsc;

use crate::message::QueueMessage;
use crate::progress::ProgressCalculator;
use crate::store::StatusStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StatusStore>,
    pub progress: ProgressCalculator,
    pub ingest: mpsc::Sender<QueueMessage>,
}

impl AppState {
    pub fn new(store: Arc<dyn StatusStore>, ingest: mpsc::Sender<QueueMessage>) -> Self {
        let progress = ProgressCalculator::new(store.clone());
        AppState {
            store,
            progress,
            ingest,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/status/{pkg}/{env}", get(status::status_head))
        .route("/status/{pkg}/{env}/{version}", get(status::status))
        .route("/status-events/{pkg}/{env}", get(status::events_head))
        .route("/status-events/{pkg}/{env}/{version}", get(status::events))
        .route("/progress/{pkg}/{env}", get(status::progress_head))
        .route("/progress/{pkg}/{env}/{version}", get(status::progress))
        .route("/messages", post(status::ingest))
        .with_state(state)
}
