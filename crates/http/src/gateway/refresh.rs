//! Credential renewal strategies used by the gateway after a 401

use crate::client::{PublicAdminClient, error::ClientError};
use admin_core::Credential;
use async_trait::async_trait;

/// Obtains a replacement credential
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// Exchange the current credential (if any) for a new one
    async fn refresh(&self, current: Option<Credential>) -> Result<Credential, ClientError>;
}

/// Calls the backend refresh endpoint
#[derive(Debug, Clone)]
pub struct EndpointRefresher {
    client: PublicAdminClient,
}

impl EndpointRefresher {
    pub fn new(client: PublicAdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialRefresher for EndpointRefresher {
    async fn refresh(&self, current: Option<Credential>) -> Result<Credential, ClientError> {
        let response = self.client.refresh(current.as_ref()).await?;
        Ok(Credential::new(response.access_token))
    }
}

/// Never renews; a 401 goes straight to session expiry
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefresh;

#[async_trait]
impl CredentialRefresher for NoRefresh {
    async fn refresh(&self, _current: Option<Credential>) -> Result<Credential, ClientError> {
        Err(ClientError::AuthenticationFailed(
            "credential refresh is disabled".to_string(),
        ))
    }
}
