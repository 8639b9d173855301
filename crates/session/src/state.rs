//! Session state machine states

use admin_core::Credential;
use admin_http::User;

/// Why the console has no live session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// Nothing was stored (first visit)
    NoCredential,
    /// The user signed out
    LoggedOut,
    /// The stored credential failed validation
    Invalid,
    /// The session expired while in use
    Expired,
}

/// Current session lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing has been checked yet
    Uninitialized,
    /// A stored credential is being validated
    Checking,
    /// Live session
    Authenticated { user: User, credential: Credential },
    /// No live session
    Unauthenticated { reason: SignOutReason },
    /// Transient state while an expired session is cleaned up
    Expired,
}

impl SessionState {
    /// Still waiting for the first check to finish
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Checking)
    }

    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    pub const fn credential(&self) -> Option<&Credential> {
        match self {
            Self::Authenticated { credential, .. } => Some(credential),
            _ => None,
        }
    }

    /// Short name for logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Checking => "checking",
            Self::Authenticated { .. } => "authenticated",
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::Expired => "expired",
        }
    }
}
