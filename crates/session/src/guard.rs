//! Route protection decisions
//!
//! [`decide`] is the single rule the presentation layer uses to protect a
//! route. [`RouteGuard`] applies it to the live session state.

use crate::state::{SessionState, SignOutReason};
use admin_core::AuthConfig;
use tokio::sync::watch;
use url::form_urlencoded;

/// What the presentation layer should do for a protected route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    RenderContent,
    Loading,
    Redirect(LoginRedirect),
}

/// Where to send an unauthenticated visitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub login_route: String,
    /// Path to come back to after signing in
    pub return_to: String,
    /// Show the "your session expired" notice
    pub session_expired: bool,
}

impl LoginRedirect {
    pub fn new(login_route: &str, requested_path: &str, session_expired: bool) -> Self {
        // Never bounce back to the login screen itself
        let return_to = if requested_path.is_empty() || requested_path.starts_with(login_route) {
            "/".to_string()
        } else {
            requested_path.to_string()
        };

        Self {
            login_route: login_route.to_string(),
            return_to,
            session_expired,
        }
    }

    /// Login route with `returnTo` and, when relevant, `expired` query parameters
    pub fn to_url(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair(AuthConfig::RETURN_TO_PARAM, &self.return_to);
        if self.session_expired {
            query.append_pair(AuthConfig::EXPIRED_PARAM, "true");
        }
        format!("{}?{}", self.login_route, query.finish())
    }
}

/// Map a session state to a decision for `requested_path`
pub fn decide(state: &SessionState, requested_path: &str, login_route: &str) -> GuardDecision {
    match state {
        SessionState::Uninitialized | SessionState::Checking => GuardDecision::Loading,
        SessionState::Authenticated { .. } => GuardDecision::RenderContent,
        SessionState::Expired => {
            GuardDecision::Redirect(LoginRedirect::new(login_route, requested_path, true))
        }
        SessionState::Unauthenticated { reason } => GuardDecision::Redirect(LoginRedirect::new(
            login_route,
            requested_path,
            *reason == SignOutReason::Expired,
        )),
    }
}

/// Guard bound to a live session
#[derive(Debug, Clone)]
pub struct RouteGuard {
    state: watch::Receiver<SessionState>,
    login_route: String,
}

impl RouteGuard {
    pub fn new(state: watch::Receiver<SessionState>, login_route: impl Into<String>) -> Self {
        Self {
            state,
            login_route: login_route.into(),
        }
    }

    /// Decision for the current state
    pub fn decision(&self, requested_path: &str) -> GuardDecision {
        decide(&self.state.borrow(), requested_path, &self.login_route)
    }

    /// Wait until the session leaves its loading states, then decide
    pub async fn settled(&mut self, requested_path: &str) -> GuardDecision {
        if let Ok(state) = self.state.wait_for(|state| !state.is_loading()).await {
            return decide(&state, requested_path, &self.login_route);
        }
        // The session context is gone; decide on whatever it left behind
        self.decision(requested_path)
    }
}
