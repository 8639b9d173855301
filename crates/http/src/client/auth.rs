//! Authentication API client methods

use super::{ClientError, PublicAdminClient};
use crate::types::{AuthenticateRequest, AuthenticateResponse, RefreshResponse, SessionProbe, User};
use admin_core::Credential;
use reqwest::Method;
use tracing::debug;

impl PublicAdminClient {
    /// Exchange an identity and secret for a bearer token
    pub async fn authenticate(
        &self,
        identity: &str,
        secret: &str,
    ) -> Result<AuthenticateResponse, ClientError> {
        let request = self
            .request(Method::POST, &self.endpoints().authenticate)
            .json(&AuthenticateRequest {
                identity: identity.to_string(),
                secret: secret.to_string(),
            });
        self.execute(request).await
    }

    /// Tell the backend the session is over. The response body is ignored.
    pub async fn logout(&self, credential: Option<&Credential>) -> Result<(), ClientError> {
        let response = self
            .request_with(Method::POST, &self.endpoints().logout, credential)
            .send()
            .await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }

    /// Obtain a fresh bearer token using the current one (or a refresh cookie)
    pub async fn refresh(
        &self,
        credential: Option<&Credential>,
    ) -> Result<RefreshResponse, ClientError> {
        let request = self.request_with(Method::POST, &self.endpoints().refresh, credential);
        self.execute(request).await
    }

    /// Ask the backend whether `credential` still represents a live session.
    ///
    /// The status code alone decides liveness. A transport failure is
    /// returned as an error so the caller can decide how to treat it.
    pub async fn validate_session(
        &self,
        credential: &Credential,
    ) -> Result<SessionProbe, ClientError> {
        let response = self
            .request_with(Method::GET, &self.endpoints().validate, Some(credential))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            debug!(status = status.as_u16(), "Session validation rejected");
            return Ok(SessionProbe {
                alive: false,
                user: None,
            });
        }

        let user = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .as_ref()
            .and_then(User::from_body);

        Ok(SessionProbe { alive: true, user })
    }
}
