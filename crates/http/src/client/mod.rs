//! AuthServer HTTP client
//!
//! [`PublicAdminClient`] talks to endpoints that manage the credential itself
//! (authenticate, refresh, validate, logout) and never reacts to a 401 beyond
//! reporting it. Every other authenticated call goes through
//! [`crate::gateway::AuthGateway`].

pub mod auth;
pub mod error;

use admin_core::{AdminConfig, Credential, EndpointConfig};
use error::ClientError;
use reqwest::{Client, header};
use std::time::Duration;

const USER_AGENT: &str = concat!("authserver-admin/", env!("CARGO_PKG_VERSION"));

/// Client for the credential-management endpoints
#[derive(Clone)]
pub struct PublicAdminClient {
    client: Client,
    base_url: String,
    endpoints: EndpointConfig,
}

impl PublicAdminClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a client from console configuration
    pub fn from_config(config: &AdminConfig) -> Result<Self, ClientError> {
        Self::builder()
            .base_url(config.base_url.clone())
            .timeout(config.timeout())
            .endpoints(config.endpoints.clone())
            .build()
    }

    /// Create a new client builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configured endpoint paths
    pub fn endpoints(&self) -> &EndpointConfig {
        &self.endpoints
    }

    /// Underlying HTTP client, shared with the gateway
    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Absolute URL for a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a request builder without authentication
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Create a request builder carrying `credential`, if given
    pub fn request_with(
        &self,
        method: reqwest::Method,
        path: &str,
        credential: Option<&Credential>,
    ) -> reqwest::RequestBuilder {
        let request = self.request(method, path);
        match credential {
            Some(credential) => request.header(header::AUTHORIZATION, credential.bearer()),
            None => request,
        }
    }

    /// Execute a request and handle common errors
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }
}

impl std::fmt::Debug for PublicAdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicAdminClient")
            .field("base_url", &self.base_url)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PublicAdminClient`]
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    endpoints: Option<EndpointConfig>,
}

impl ClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout. A timeout is reported like any other transport failure.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Override the authentication endpoint paths
    pub fn endpoints(mut self, endpoints: EndpointConfig) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<PublicAdminClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = Client::builder()
            .user_agent(self.user_agent.unwrap_or_else(|| USER_AGENT.to_string()));

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        Ok(PublicAdminClient {
            client: client_builder.build()?,
            base_url,
            endpoints: self.endpoints.unwrap_or_default(),
        })
    }
}
