//! Registry lookups used to enrich webhook notifications.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::PackageName;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Request(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Source of package metadata for notification enrichment.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Looks up the repository metadata for a package. `Ok(None)` means the
    /// registry knows the package but records no repository (or does not know
    /// the package at all).
    async fn repository(&self, pkg: &PackageName) -> Result<Option<serde_json::Value>>;
}

/// [`RegistryClient`] over the registry's HTTP API.
pub struct HttpRegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpRegistryClient {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn repository(&self, pkg: &PackageName) -> Result<Option<serde_json::Value>> {
        let url = format!("{}/packages/{}", self.base_url.trim_end_matches('/'), pkg);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let mut body: serde_json::Value = response.json().await?;
        Ok(match body.get_mut("repository") {
            Some(repository) => Some(repository.take()),
            None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn extracts_repository_from_package_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/packages/whatever"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "whatever",
                "repository": { "type": "git", "url": "https://example.com/whatever.git" }
            })))
            .mount(&server)
            .await;

        let client = HttpRegistryClient::new(server.uri());
        let repo = client
            .repository(&PackageName::new("whatever"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(repo["url"], "https://example.com/whatever.git");
    }

    #[tokio::test]
    async fn missing_repository_field_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/packages/whatever"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "name": "whatever" })),
            )
            .mount(&server)
            .await;

        let client = HttpRegistryClient::new(server.uri());
        let repo = client
            .repository(&PackageName::new("whatever"))
            .await
            .unwrap();
        assert!(repo.is_none());
    }

    #[tokio::test]
    async fn server_error_surfaces_as_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/packages/whatever"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpRegistryClient::new(server.uri());
        let result = client.repository(&PackageName::new("whatever")).await;
        assert!(matches!(result, Err(RegistryError::Request(_))));
    }
}
