//! Outbound webhook notifications for build lifecycle transitions.

mod config;
mod dispatcher;
mod registry;

pub use config::WebhookSettings;
pub use dispatcher::{
    dispatch_detached, DispatchError, Notification, WebhookDispatcher, WebhookEvent,
};
pub use registry::{HttpRegistryClient, RegistryClient, RegistryError};
