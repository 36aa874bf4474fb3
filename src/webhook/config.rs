//! Webhook endpoint configuration.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::PackageName;

fn default_concurrency() -> usize {
    5
}

fn default_timeout_ms() -> u64 {
    2000
}

/// Operator-supplied webhook settings.
///
/// `endpoints` is written URL-first because that is how operators think about
/// it ("this URL wants these packages"); dispatch needs the inverse, which
/// [`subscriptions`] computes.
///
/// [`subscriptions`]: WebhookSettings::subscriptions
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    /// Map of endpoint URL to the packages it subscribes to.
    #[serde(default)]
    pub endpoints: BTreeMap<String, Vec<PackageName>>,

    /// Maximum concurrent in-flight deliveries per dispatch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-delivery timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        WebhookSettings {
            endpoints: BTreeMap::new(),
            concurrency: default_concurrency(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl WebhookSettings {
    /// Inverts the endpoint map into package-to-URLs form for dispatch
    /// lookups.
    pub fn subscriptions(&self) -> BTreeMap<PackageName, Vec<String>> {
        let mut by_pkg: BTreeMap<PackageName, Vec<String>> = BTreeMap::new();
        for (url, pkgs) in &self.endpoints {
            for pkg in pkgs {
                by_pkg.entry(pkg.clone()).or_default().push(url.clone());
            }
        }
        by_pkg
    }
}
