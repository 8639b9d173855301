//! Errors surfaced by the gateway to application code
//!
//! Raw transport errors never leave the gateway; they are folded into these
//! variants so callers only deal with outcomes they can show to a user.

use crate::client::error::ClientError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The credential was rejected and could not be renewed
    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,

    /// The request was made without any credential and the backend wants one
    #[error("Sign in required")]
    NotAuthenticated,

    /// The backend could not be reached (timeout, DNS, connection reset)
    #[error("The server could not be reached. Please try again. ({0})")]
    Unavailable(String),

    /// Non-2xx response other than 401, passed through unchanged
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// 2xx response whose body did not match the expected shape
    #[error("Unexpected response from server: {0}")]
    InvalidResponse(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status carried by the error, if any
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired | Self::NotAuthenticated => Some(401),
            Self::Status { status, .. } => Some(*status),
            Self::Unavailable(_) | Self::InvalidResponse(_) | Self::InvalidRequest(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        if err.is_auth_expired() {
            return Self::SessionExpired;
        }
        match err {
            ClientError::Request(e) => e.into(),
            ClientError::Serialization(e) => Self::InvalidResponse(e.to_string()),
            ClientError::Configuration(message) => Self::InvalidRequest(message),
            other => Self::Status {
                status: other.status().unwrap_or(500),
                message: other.to_string(),
            },
        }
    }
}
