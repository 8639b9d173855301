//! Authenticated request gateway
//!
//! Every call that needs the bearer credential goes through [`AuthGateway`].
//! It attaches the current credential and handles 401 responses uniformly:
//!
//! - the first 401 starts a single refresh cycle and parks the request;
//! - any 401 that arrives while that cycle runs is parked on the same queue;
//! - when the cycle settles, every parked request gets its outcome. On success
//!   each one is re-issued with the new credential and resolves with its own
//!   response. On failure all of them fail with [`ApiError::SessionExpired`],
//!   the credential is cleared and the [`SessionExpiryHandler`] is notified
//!   once for the whole cycle.
//!
//! A 401 for a credential that has already been replaced by the time it
//! arrives does not start another cycle; the request is simply re-issued with
//! the current credential. Any non-401 response passes through untouched.

mod error;
mod refresh;

pub use error::ApiError;
#[cfg(test)]
pub use refresh::MockCredentialRefresher;
pub use refresh::{CredentialRefresher, EndpointRefresher, NoRefresh};

use crate::client::PublicAdminClient;
use admin_core::{Credential, TokenSnapshot, TokenStore};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Receives the gateway's session signals
pub trait SessionExpiryHandler: Send + Sync {
    /// Called once per failed refresh cycle
    fn on_session_expired(&self);

    /// Called after a refresh cycle installs `credential`, before parked
    /// requests are replayed
    fn on_credential_renewed(&self, _credential: &Credential) {}
}

type RefreshOutcome = Result<Arc<TokenSnapshot>, ApiError>;

/// Pending-retry queue gated by the in-flight flag
#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    pending: Vec<oneshot::Sender<RefreshOutcome>>,
}

struct GatewayInner {
    client: PublicAdminClient,
    tokens: Arc<TokenStore>,
    refresher: Arc<dyn CredentialRefresher>,
    expiry_handler: Option<Arc<dyn SessionExpiryHandler>>,
    refresh: Mutex<RefreshState>,
}

impl GatewayInner {
    fn lock_refresh(&self) -> MutexGuard<'_, RefreshState> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single chokepoint for authenticated requests
#[derive(Clone)]
pub struct AuthGateway {
    inner: Arc<GatewayInner>,
}

impl AuthGateway {
    /// Start building a gateway over `client` reading credentials from `tokens`
    pub fn builder(client: PublicAdminClient, tokens: Arc<TokenStore>) -> AuthGatewayBuilder {
        AuthGatewayBuilder {
            client,
            tokens,
            refresher: None,
            expiry_handler: None,
        }
    }

    /// The credential store this gateway reads from
    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.inner.tokens
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.inner.client.base_url()
    }

    /// Whether a refresh cycle is in flight
    pub fn is_refreshing(&self) -> bool {
        self.inner.lock_refresh().refreshing
    }

    /// Create a request builder. The credential is attached when the request is sent.
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.inner.client.request(method, path)
    }

    /// Send a request, recovering from a 401 at most once
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ApiError> {
        let request = request.build()?;
        let sent = self.inner.tokens.snapshot();

        let Some(replay) = request.try_clone() else {
            return self.send_once(request, &sent).await;
        };

        let response = self.dispatch(request, sent.credential.as_ref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        if sent.credential.is_none() {
            return Err(ApiError::NotAuthenticated);
        }

        debug!(method = %replay.method(), url = %replay.url(), "Request rejected with 401");
        let renewed = self.recover(sent.generation).await?;

        let response = self.dispatch(replay, renewed.credential.as_ref()).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Request rejected again after credential renewal");
            self.expire(renewed.generation);
            return Err(ApiError::SessionExpired);
        }
        Ok(response)
    }

    /// Send a request and decode a JSON body
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))
        } else {
            Err(status_error(response).await)
        }
    }

    /// Send a request whose successful response has no interesting body
    pub async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ApiError> {
        let response = self.send(request).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    // Streaming bodies cannot be re-issued: renew the session for later calls
    // but fail this one.
    async fn send_once(
        &self,
        request: reqwest::Request,
        sent: &TokenSnapshot,
    ) -> Result<Response, ApiError> {
        let response = self.dispatch(request, sent.credential.as_ref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        if sent.credential.is_none() {
            return Err(ApiError::NotAuthenticated);
        }

        self.recover(sent.generation).await?;
        Err(ApiError::Status {
            status: StatusCode::UNAUTHORIZED.as_u16(),
            message: "request body could not be replayed after credential refresh".to_string(),
        })
    }

    async fn dispatch(
        &self,
        mut request: reqwest::Request,
        credential: Option<&Credential>,
    ) -> Result<Response, ApiError> {
        if let Some(credential) = credential {
            match HeaderValue::from_str(&credential.bearer()) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    request.headers_mut().insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored credential is not a valid header value, sending without it"),
            }
        }

        Ok(self.inner.client.http().execute(request).await?)
    }

    /// Wait for a credential newer than `sent_generation`, joining or starting a refresh cycle
    async fn recover(&self, sent_generation: u64) -> RefreshOutcome {
        let waiter = {
            let mut state = self.inner.lock_refresh();

            if !state.refreshing {
                let current = self.inner.tokens.snapshot();
                if current.generation != sent_generation {
                    debug!("Credential replaced since request was sent, reusing it");
                    return if current.credential.is_some() {
                        Ok(current)
                    } else {
                        Err(ApiError::SessionExpired)
                    };
                }
            }

            let (tx, rx) = oneshot::channel();
            state.pending.push(tx);

            if !state.refreshing {
                state.refreshing = true;
                let gateway = self.clone();
                tokio::spawn(async move {
                    gateway.run_refresh(sent_generation).await;
                });
            } else {
                debug!(queued = state.pending.len(), "Refresh in flight, request parked");
            }
            rx
        };

        waiter.await.unwrap_or(Err(ApiError::SessionExpired))
    }

    async fn run_refresh(&self, cycle_generation: u64) {
        let mut cycle = CycleGuard {
            inner: &self.inner,
            settled: false,
        };

        info!("Refreshing credential");
        let current = self.inner.tokens.get();
        let result = self.inner.refresher.refresh(current).await;

        let mut expired = false;
        let mut renewed = None;
        let (outcome, pending) = {
            let mut state = self.inner.lock_refresh();
            let latest = self.inner.tokens.snapshot();

            let outcome = if latest.generation != cycle_generation {
                // A login or logout landed while the refresh was running
                if latest.credential.is_some() {
                    Ok(latest)
                } else {
                    Err(ApiError::SessionExpired)
                }
            } else {
                match result {
                    Ok(credential) => {
                        info!("Credential refreshed");
                        self.inner.tokens.set(credential.clone());
                        renewed = Some(credential);
                        Ok(self.inner.tokens.snapshot())
                    }
                    Err(e) => {
                        warn!("Credential refresh failed: {e}");
                        self.inner.tokens.clear();
                        expired = true;
                        Err(ApiError::SessionExpired)
                    }
                }
            };

            state.refreshing = false;
            cycle.settled = true;
            (outcome, std::mem::take(&mut state.pending))
        };

        if expired {
            self.notify_expired();
        }
        if let (Some(credential), Some(handler)) = (&renewed, &self.inner.expiry_handler) {
            handler.on_credential_renewed(credential);
        }

        debug!(waiters = pending.len(), "Settling parked requests");
        for waiter in pending {
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Clear the credential stored under `generation` and signal expiry, unless
    /// it has already been replaced or cleared.
    fn expire(&self, generation: u64) {
        {
            let _state = self.inner.lock_refresh();
            let current = self.inner.tokens.snapshot();
            if current.generation != generation || current.credential.is_none() {
                return;
            }
            self.inner.tokens.clear();
        }
        self.notify_expired();
    }

    fn notify_expired(&self) {
        warn!("Session expired");
        if let Some(handler) = &self.inner.expiry_handler {
            handler.on_session_expired();
        }
    }
}

/// Releases parked requests if a refresh cycle unwinds before settling
struct CycleGuard<'a> {
    inner: &'a GatewayInner,
    settled: bool,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let pending = {
            let mut state = self.inner.lock_refresh();
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };
        warn!(waiters = pending.len(), "Credential refresh aborted");
        for waiter in pending {
            let _ = waiter.send(Err(ApiError::Unavailable(
                "credential refresh aborted".to_string(),
            )));
        }
    }
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("client", &self.inner.client)
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}

async fn status_error(response: Response) -> ApiError {
    let status = response.status();
    let message = response.text().await.unwrap_or_else(|_| status.to_string());
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Builder for [`AuthGateway`]
pub struct AuthGatewayBuilder {
    client: PublicAdminClient,
    tokens: Arc<TokenStore>,
    refresher: Option<Arc<dyn CredentialRefresher>>,
    expiry_handler: Option<Arc<dyn SessionExpiryHandler>>,
}

impl AuthGatewayBuilder {
    /// Strategy used to renew the credential. Defaults to [`EndpointRefresher`].
    pub fn refresher(mut self, refresher: Arc<dyn CredentialRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Receiver of the expiry signal
    pub fn expiry_handler(mut self, handler: Arc<dyn SessionExpiryHandler>) -> Self {
        self.expiry_handler = Some(handler);
        self
    }

    /// Build the gateway
    pub fn build(self) -> AuthGateway {
        let refresher = self
            .refresher
            .unwrap_or_else(|| Arc::new(EndpointRefresher::new(self.client.clone())));

        AuthGateway {
            inner: Arc::new(GatewayInner {
                client: self.client,
                tokens: self.tokens,
                refresher,
                expiry_handler: self.expiry_handler,
                refresh: Mutex::new(RefreshState::default()),
            }),
        }
    }
}
