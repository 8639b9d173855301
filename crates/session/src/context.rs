//! Session context: the owner of the session lifecycle
//!
//! ```text
//! Uninitialized -> Checking -> Authenticated | Unauthenticated
//!        any state -> Expired -> Unauthenticated
//! ```
//!
//! All transitions happen synchronously on local state; network calls only
//! decide which transition to take. Results of a session check that has been
//! superseded (by a login, logout, expiry, a newer check or teardown) are
//! discarded.

use crate::error::LoginError;
use crate::guard::{GuardDecision, LoginRedirect, RouteGuard, decide};
use crate::state::{SessionState, SignOutReason};
use crate::validator::SessionValidator;
use admin_core::{AuthConfig, Credential, TokenStore};
use admin_http::{PublicAdminClient, SessionExpiryHandler, User};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Sends the presentation layer to the login screen
#[cfg_attr(test, mockall::automock)]
pub trait Redirector: Send + Sync {
    fn redirect(&self, target: &LoginRedirect);
}

/// Redirector that only records the redirect in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRedirector;

impl Redirector for TracingRedirector {
    fn redirect(&self, target: &LoginRedirect) {
        info!(url = %target.to_url(), "Redirecting to login");
    }
}

/// Process-wide session state and its transitions
pub struct SessionContext {
    tokens: Arc<TokenStore>,
    client: PublicAdminClient,
    validator: SessionValidator,
    redirector: Arc<dyn Redirector>,
    login_route: String,
    current_path: Mutex<String>,
    state_tx: watch::Sender<SessionState>,
    epoch: AtomicU64,
    shut_down: AtomicBool,
}

impl SessionContext {
    pub fn new(
        tokens: Arc<TokenStore>,
        client: PublicAdminClient,
        validator: SessionValidator,
        redirector: Arc<dyn Redirector>,
        login_route: impl Into<String>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Uninitialized);
        Self {
            tokens,
            client,
            validator,
            redirector,
            login_route: login_route.into(),
            current_path: Mutex::new("/".to_string()),
            state_tx,
            epoch: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state_tx.borrow().user().cloned()
    }

    /// Live credential, including any renewal made by the gateway
    pub fn credential(&self) -> Option<Credential> {
        if self.is_authenticated() {
            self.tokens.get()
        } else {
            None
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state_tx.borrow().is_loading()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state_tx.borrow().is_authenticated()
    }

    /// Record the path currently shown, used as the return target on expiry
    pub fn set_current_path(&self, path: impl Into<String>) {
        *self
            .current_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = path.into();
    }

    fn current_path(&self) -> String {
        self.current_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Guard bound to this session
    pub fn route_guard(&self) -> RouteGuard {
        RouteGuard::new(self.subscribe(), self.login_route.clone())
    }

    /// Guard decision for `requested_path` in the current state
    pub fn guard(&self, requested_path: &str) -> GuardDecision {
        decide(&self.state_tx.borrow(), requested_path, &self.login_route)
    }

    /// Establish the initial state from the stored credential
    pub async fn initialize(&self) -> SessionState {
        let epoch = self.next_epoch();

        let Some(credential) = self.tokens.get().or_else(|| self.tokens.load()) else {
            debug!("No stored credential");
            self.transition(SessionState::Unauthenticated {
                reason: SignOutReason::NoCredential,
            });
            return self.state();
        };

        self.transition(SessionState::Checking);
        let outcome = self.validator.validate(Some(&credential)).await;

        if !self.is_current(epoch) {
            debug!("Discarding superseded session check");
            return self.state();
        }

        let user = outcome
            .valid
            .then(|| outcome.user.or_else(|| self.load_user()))
            .flatten();

        match user {
            Some(user) => {
                self.store_user(&user);
                info!(user_id = %user.id, "Session restored");
                self.transition(SessionState::Authenticated { user, credential });
            }
            None => {
                if outcome.valid {
                    warn!("Session is valid but no user profile is available");
                }
                self.clear_local();
                self.transition(SessionState::Unauthenticated {
                    reason: SignOutReason::Invalid,
                });
            }
        }

        self.state()
    }

    /// Sign in. Failure leaves the state and the stored credential untouched.
    pub async fn login(&self, identity: &str, secret: &str) -> Result<User, LoginError> {
        let response = match self.client.authenticate(identity, secret).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Login failed: {e}");
                return Err(e.into());
            }
        };

        self.next_epoch();
        let credential = Credential::new(response.access_token);
        let user = response.user;

        self.tokens.set(credential.clone());
        self.store_user(&user);
        info!(user_id = %user.id, "Signed in");
        self.transition(SessionState::Authenticated {
            user: user.clone(),
            credential,
        });

        Ok(user)
    }

    /// Sign out locally right away and notify the backend in the background.
    ///
    /// The returned handle completes when the backend call does; the local
    /// state never waits for it. Outside a tokio runtime the backend is not
    /// notified and `None` is returned.
    pub fn logout(&self) -> Option<JoinHandle<()>> {
        let credential = self.tokens.get().or_else(|| self.tokens.load());
        let notify = match Handle::try_current() {
            Ok(runtime) => {
                let client = self.client.clone();
                Some(runtime.spawn(async move {
                    if let Err(e) = client.logout(credential.as_ref()).await {
                        debug!("Backend logout failed: {e}");
                    }
                }))
            }
            Err(_) => {
                warn!("No async runtime, skipping backend logout");
                None
            }
        };

        self.next_epoch();
        self.clear_local();
        self.transition(SessionState::Unauthenticated {
            reason: SignOutReason::LoggedOut,
        });
        info!("Signed out");

        notify
    }

    /// Tear down the session and redirect to login. Repeated calls are no-ops.
    pub fn handle_session_expiry(&self) {
        let expired = self.state_tx.send_if_modified(|state| match state {
            SessionState::Expired | SessionState::Unauthenticated { .. } => false,
            _ => {
                *state = SessionState::Expired;
                true
            }
        });

        if !expired {
            debug!("Session already ended, ignoring expiry");
            return;
        }

        warn!("Session expired");
        self.next_epoch();
        self.clear_local();
        self.transition(SessionState::Unauthenticated {
            reason: SignOutReason::Expired,
        });

        let target = LoginRedirect::new(&self.login_route, &self.current_path(), true);
        self.redirector.redirect(&target);
    }

    /// Stop acting on in-flight checks
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.next_epoch();
    }

    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, epoch: u64) -> bool {
        !self.shut_down.load(Ordering::SeqCst) && self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state_tx.send_replace(next);
        debug!(from = previous.name(), to = self.state_tx.borrow().name(), "Session transition");
    }

    fn clear_local(&self) {
        self.tokens.clear();
        if let Err(e) = self.tokens.storage().remove(AuthConfig::USER_KEY) {
            warn!("Failed to remove cached user: {e}");
        }
    }

    fn store_user(&self, user: &User) {
        let result = serde_json::to_string(user)
            .map_err(admin_core::CoreError::from)
            .and_then(|serialized| self.tokens.storage().set(AuthConfig::USER_KEY, &serialized));
        if let Err(e) = result {
            warn!("Failed to cache user: {e}");
        }
    }

    fn load_user(&self) -> Option<User> {
        let stored = self.tokens.storage().get(AuthConfig::USER_KEY).ok().flatten()?;
        serde_json::from_str(&stored).ok()
    }
}

impl SessionExpiryHandler for SessionContext {
    fn on_session_expired(&self) {
        self.handle_session_expiry();
    }

    fn on_credential_renewed(&self, renewed: &Credential) {
        let updated = self.state_tx.send_if_modified(|state| match state {
            SessionState::Authenticated { credential, .. } if *credential != *renewed => {
                *credential = renewed.clone();
                true
            }
            _ => false,
        });
        if updated {
            debug!("Session credential renewed");
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &self.state_tx.borrow().name())
            .field("login_route", &self.login_route)
            .finish_non_exhaustive()
    }
}
