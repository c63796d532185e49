//! Qrator API client for the exporter.
//!
//! This module talks to the Qrator JSON-RPC API: every call is a POST to
//! `{api_url}/{method_class}/{entity_id}` answered with a `result`/`error`/`id`
//! envelope.

use std::time::Duration;
use log::error;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use crate::models::{Domain, DomainStatistics, Envelope, QratorRequest};
use crate::utils::format_request_url;

/// Header carrying the API token
pub const AUTH_HEADER: &str = "X-Qrator-Auth";

/// Request id sent with every call; responses are not correlated by it
const REQUEST_ID: i64 = 1;

/// Errors that can occur during Qrator API operations
#[derive(Debug, Error)]
pub enum QratorError {
    #[error("Expected digits only in client id, got: \"{0}\"")]
    Validation(String),
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Cannot decode response: {0}")]
    Decode(String),
    #[error("Got error in response: {0}")]
    Upstream(String),
}

impl From<serde_json::Error> for QratorError {
    fn from(err: serde_json::Error) -> Self {
        QratorError::Decode(err.to_string())
    }
}

/// Qrator API client
#[derive(Debug, Clone)]
pub struct QratorClient {
    /// HTTP client, carries the request timeout
    client: Client,
    /// Base URL of the API
    api_url: String,
    /// API token
    auth_token: String,
}

impl QratorClient {
    /// Create a new Qrator client instance
    ///
    /// # Arguments
    ///
    /// * `api_url` - Base URL, e.g. `https://api.qrator.net/request`
    /// * `auth_token` - Token sent in the `X-Qrator-Auth` header
    /// * `timeout` - Bound on each whole request/response cycle
    pub fn new(api_url: &str, auth_token: &str, timeout: Duration) -> Result<Self, QratorError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            auth_token: auth_token.to_string(),
        })
    }

    /// Send a method call and return the raw response body
    ///
    /// The HTTP status is not inspected, the envelope decides whether the
    /// call succeeded.
    pub async fn post_request(
        &self,
        method_class: &str,
        entity_id: u64,
        method: &str,
    ) -> Result<Vec<u8>, QratorError> {
        let url = format_request_url(&self.api_url, method_class, entity_id);
        let body = QratorRequest {
            method,
            params: "",
            id: REQUEST_ID,
        };

        let response = self.client
            .post(&url)
            .header("Content-Type", "application/json")
            .header(AUTH_HEADER, &self.auth_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Cannot make {} request to {}: {}", method, url, e);
                e
            })?;

        let bytes = response.bytes().await.map_err(|e| {
            error!("Cannot read {} response from {}: {}", method, url, e);
            e
        })?;

        Ok(bytes.to_vec())
    }

    /// Call a method and unwrap its envelope
    async fn call<T: DeserializeOwned>(
        &self,
        method_class: &str,
        entity_id: u64,
        method: &str,
    ) -> Result<Option<T>, QratorError> {
        let body = self.post_request(method_class, entity_id, method).await?;
        decode_envelope(&body)
    }

    /// Liveness check, succeeds when the account answers `ping` without error
    pub async fn ping(&self, client_id: u64) -> Result<(), QratorError> {
        self.call::<String>("client", client_id, "ping").await?;
        Ok(())
    }

    /// List all domains bound to the account
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Domain>)` with the domains as listed upstream, possibly empty
    /// * `Err(QratorError)` if the request, decoding or the API call failed
    pub async fn list_domains(&self, client_id: u64) -> Result<Vec<Domain>, QratorError> {
        let domains = self.call::<Vec<Domain>>("client", client_id, "domains_get").await?;
        Ok(domains.unwrap_or_default())
    }

    /// Get the latest statistics snapshot for a domain
    pub async fn get_statistics(&self, domain: &Domain) -> Result<DomainStatistics, QratorError> {
        self.call::<DomainStatistics>("domain", domain.id, "statistics_get")
            .await?
            .ok_or_else(|| QratorError::Decode(format!("missing statistics for domain {}", domain.name)))
    }
}

/// Decode a response envelope, turning a non-empty `error` into `QratorError::Upstream`
pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, QratorError> {
    let envelope: Envelope<T> = serde_json::from_slice(body)?;

    if let Some(message) = envelope.error_message() {
        return Err(QratorError::Upstream(message.to_string()));
    }

    Ok(envelope.result)
}
