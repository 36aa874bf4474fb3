//! Depot Status - build status aggregation and webhook notification service.
//!
//! This library tracks build lifecycle messages from the build queue,
//! aggregates them into per-package status records, derives completion
//! progress, and notifies subscribed webhooks when builds start and finish.

pub mod config;
pub mod handler;
pub mod message;
pub mod normalize;
pub mod progress;
pub mod server;
pub mod store;
pub mod stream;
pub mod types;
pub mod webhook;

#[cfg(test)]
pub mod test_utils;
