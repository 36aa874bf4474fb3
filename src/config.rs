//! Service configuration, loaded from a JSON file.

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::webhook::WebhookSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_stream_concurrency() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Maximum queue messages handled concurrently.
    #[serde(default = "default_stream_concurrency")]
    pub stream_concurrency: usize,

    #[serde(default)]
    pub webhooks: WebhookSettings,

    /// Registry base URL for notification enrichment. Unset disables
    /// enrichment.
    #[serde(default)]
    pub registry_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: default_listen(),
            stream_concurrency: default_stream_concurrency(),
            webhooks: WebhookSettings::default(),
            registry_url: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.listen, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.stream_concurrency, 10);
        assert!(config.webhooks.endpoints.is_empty());
        assert!(config.registry_url.is_none());
    }

    #[test]
    fn full_config_parses() {
        let config: Config = serde_json::from_str(
            r#"{
                "listen": "127.0.0.1:8080",
                "stream_concurrency": 4,
                "registry_url": "https://registry.example.com",
                "webhooks": {
                    "endpoints": { "https://ci.example.com/hook": ["whatever"] },
                    "concurrency": 2,
                    "timeout_ms": 500
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.listen.port(), 8080);
        assert_eq!(config.stream_concurrency, 4);
        assert_eq!(config.webhooks.concurrency, 2);
        assert_eq!(config.webhooks.timeout_ms, 500);
        assert_eq!(
            config.registry_url.as_deref(),
            Some("https://registry.example.com")
        );
    }
}
