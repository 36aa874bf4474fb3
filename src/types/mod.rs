//! Core domain types.

mod ids;

pub use ids::{BuildSpec, Environment, EventId, PackageName, UnknownEnvironment};
