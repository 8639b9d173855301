//! Session validation against the backend

use admin_core::Credential;
use admin_http::{PublicAdminClient, User};
use chrono::{Duration, Utc};
use tracing::{debug, warn};

/// Result of asking whether a credential is still good
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// A verdict was reached; `false` means "not checked yet"
    pub checked: bool,
    /// The backend accepted the credential
    pub valid: bool,
    /// Profile returned with a successful check
    pub user: Option<User>,
}

impl ValidationOutcome {
    const fn invalid() -> Self {
        Self {
            checked: true,
            valid: false,
            user: None,
        }
    }
}

/// Answers "is this credential still good?" by asking the backend.
///
/// Fails closed: transport errors count as invalid. A credential whose
/// embedded expiry has already passed is rejected without a round trip.
#[derive(Debug, Clone)]
pub struct SessionValidator {
    client: PublicAdminClient,
    leeway: Duration,
}

impl SessionValidator {
    pub fn new(client: PublicAdminClient) -> Self {
        Self {
            client,
            leeway: Duration::zero(),
        }
    }

    /// Clock skew tolerated by the local expiry pre-check
    #[must_use]
    pub const fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    pub async fn validate(&self, credential: Option<&Credential>) -> ValidationOutcome {
        let Some(credential) = credential else {
            return ValidationOutcome::invalid();
        };

        if credential.is_expired_at(Utc::now(), self.leeway) {
            debug!(expires_at = ?credential.expires_at(), "Credential expired, skipping validation request");
            return ValidationOutcome::invalid();
        }

        match self.client.validate_session(credential).await {
            Ok(probe) => ValidationOutcome {
                checked: true,
                valid: probe.alive,
                user: probe.user,
            },
            Err(e) => {
                warn!("Session validation failed, treating session as invalid: {e}");
                ValidationOutcome::invalid()
            }
        }
    }
}
