//! Session error types

use admin_http::ClientError;
use thiserror::Error;

/// Displayed when the backend rejects a login without a usable message
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid identity or secret";

/// Outcome of a failed login, safe to show to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    /// The backend rejected the identity/secret pair
    #[error("{0}")]
    InvalidCredentials(String),

    /// The backend could not be reached; the attempt can be repeated
    #[error("Could not reach the server. Please try again.")]
    Unavailable,

    /// Any other backend failure
    #[error("Sign-in failed: {0}")]
    Server(String),
}

impl From<ClientError> for LoginError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::AuthenticationFailed(message)
            | ClientError::Forbidden(message)
            | ClientError::BadRequest(message) => Self::InvalidCredentials(displayable(message)),
            err if err.is_transport() => Self::Unavailable,
            other => Self::Server(other.to_string()),
        }
    }
}

fn displayable(message: String) -> String {
    let trimmed = message.trim();
    if trimmed.is_empty() || trimmed.starts_with('{') || trimmed.starts_with('<') {
        INVALID_CREDENTIALS_MESSAGE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Errors raised while wiring the console together
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] ClientError),
}
