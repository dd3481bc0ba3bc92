//! HTTP `RegistryClient` for Confluent-compatible schema registries.
//!
//! # Feature Flag
//! This module requires the `remote` feature flag (enables `reqwest`).
//!
//! ```toml
//! avrosync-registry = { version = "0.1", features = ["remote"] }
//! ```
//!
//! # Endpoints
//! - `GET /subjects/{subject}/versions`
//! - `GET /subjects/{subject}/versions/{version}`
//! - `GET /subjects/{subject}/versions/latest`

use crate::client::{RegisteredSchema, RegistryClient};
use crate::config::RegistryConfig;
use async_trait::async_trait;
use avrosync_core::error::TransportError;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const ACCEPT: &str = "application/vnd.schemaregistry.v1+json";

/// Registry client speaking the Confluent REST API.
pub struct HttpRegistryClient {
    client: Client,
    base_url: Url,
}

impl HttpRegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let base_url = Url::parse(&config.url)
            .map_err(|e| TransportError::Other(format!("invalid registry url {}: {e}", config.url)))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Other(format!(
                "invalid registry url {}: not a base url",
                config.url
            )));
        }

        Ok(Self { client, base_url })
    }

    /// `{base}/subjects/{subject}/versions[/{version}]`, each segment
    /// percent-encoded.
    fn subject_url(&self, subject: &str, version: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("subjects")
                .push(subject)
                .push("versions");
            if let Some(version) = version {
                segments.push(version);
            }
        }
        url
    }

    fn versions_url(&self, subject: &str) -> Url {
        self.subject_url(subject, None)
    }

    fn version_url(&self, subject: &str, version: &str) -> Url {
        self.subject_url(subject, Some(version))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, TransportError> {
        let resp = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %url, status = status.as_u16(), "registry response");
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn versions(&self, subject: &str) -> Result<Vec<u32>, TransportError> {
        self.get(self.versions_url(subject)).await
    }

    async fn by_subject_version(
        &self,
        subject: &str,
        version: u32,
    ) -> Result<RegisteredSchema, TransportError> {
        self.get(self.version_url(subject, &version.to_string())).await
    }

    async fn latest(&self, subject: &str) -> Result<RegisteredSchema, TransportError> {
        self.get(self.version_url(subject, "latest")).await
    }
}
