//! reqwest-backed implementation of [`Backend`].
//!
//! # Security Note - Logging
//!
//! The bearer token is held in a `SecretString` and only exposed while the
//! `Authorization` header is built. Request URLs are logged at debug level;
//! tokens never appear in them.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::config::Config;
use crate::error::{Result, SyncError};

use super::{Backend, Entity, PageEnvelope, PageRequest, PageResult};

/// REST backend reached over HTTP.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl HttpBackend {
    /// Build a backend from configuration.
    ///
    /// Configures the HTTP client with the configured total timeout and a
    /// 10s connect timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| SyncError::Config(format!("invalid api_url '{}': {e}", config.api_url)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: config.api_token().map(SecretString::from),
        })
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::Config(format!("api_url '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        tracing::debug!("GET {url}");
        let response = self.authorized(self.client.get(url)).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResult> {
        let mut url = self.endpoint(&[&request.collection])?;
        url.query_pairs_mut().extend_pairs(request.params());

        let envelope: PageEnvelope = self.get_json(url, &request.collection).await?;
        Ok(PageResult::from_envelope(envelope, request.key.page))
    }

    async fn fetch_entity(&self, collection: &str, id: &str) -> Result<Entity> {
        let url = self.endpoint(&[collection, id])?;
        self.get_json(url, &format!("{collection}/{id}")).await
    }

    async fn fetch_related(&self, collection: &str, parent_id: &str) -> Result<Vec<Entity>> {
        let url = self.endpoint(&[collection, "by-parent", parent_id])?;
        let related: Option<Vec<Entity>> = self
            .get_json(url, &format!("{collection}/by-parent/{parent_id}"))
            .await?;
        Ok(related.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(api_url: &str) -> HttpBackend {
        let config = Config {
            api_url: api_url.to_string(),
            ..Config::default()
        };
        HttpBackend::from_config(&config).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let backend = backend("http://localhost:8080/api/");
        let url = backend.endpoint(&["approvals", "by-parent", "17"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/approvals/by-parent/17");
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let backend = backend("http://localhost:8080/api");
        let url = backend.endpoint(&["purchases", "PR 12/3"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/purchases/PR%2012%2F3");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let config = Config {
            api_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            HttpBackend::from_config(&config),
            Err(SyncError::Config(_))
        ));
    }
}
