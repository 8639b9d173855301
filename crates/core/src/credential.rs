//! Bearer credential type

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque bearer token issued by the AuthServer backend.
///
/// The token is never validated locally. When it happens to be a JWT, the
/// `exp` claim can be read to skip a validation round trip for a token that
/// is self-evidently expired.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

impl Credential {
    /// Wrap a raw token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Expiry encoded in the token's `exp` claim, if it has one
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let mut segments = self.0.split('.');
        let (Some(_header), Some(payload), Some(_signature)) =
            (segments.next(), segments.next(), segments.next())
        else {
            return None;
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
        DateTime::from_timestamp(claim.exp?, 0)
    }

    /// Whether the embedded expiry has passed at `now`, allowing `leeway` for clock skew.
    ///
    /// Tokens without a readable expiry, or whose expiry plus `leeway` is out
    /// of range, are never considered expired here.
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        self.expires_at()
            .and_then(|expires_at| expires_at.checked_add_signed(leeway))
            .is_some_and(|deadline| deadline <= now)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        f.debug_tuple("Credential")
            .field(&format_args!("{prefix}…"))
            .finish()
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_payload(payload: &str) -> Credential {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload);
        Credential::new(format!("{header}.{body}.c2lnbmF0dXJl"))
    }

    #[test]
    fn test_reads_exp_claim() {
        let credential = jwt_with_payload(r#"{"sub":"admin","exp":1700000000}"#);
        let expires_at = credential.expires_at().unwrap();
        assert_eq!(expires_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_opaque_token_has_no_expiry() {
        let credential = Credential::new("not-a-jwt");
        assert!(credential.expires_at().is_none());
        assert!(!credential.is_expired_at(Utc::now(), Duration::zero()));
    }

    #[test]
    fn test_missing_exp_claim_is_not_expired() {
        let credential = jwt_with_payload(r#"{"sub":"admin"}"#);
        assert!(credential.expires_at().is_none());
        assert!(!credential.is_expired_at(Utc::now(), Duration::zero()));
    }

    #[test]
    fn test_expiry_respects_leeway() {
        let now = Utc::now();
        let exp = now.timestamp() - 10;
        let credential = jwt_with_payload(&format!(r#"{{"exp":{exp}}}"#));

        assert!(credential.is_expired_at(now, Duration::zero()));
        assert!(!credential.is_expired_at(now, Duration::seconds(30)));
    }

    #[test]
    fn test_far_future_expiry_does_not_overflow() {
        // Last second chrono can represent
        let credential = jwt_with_payload(r#"{"exp":8210266876799}"#);
        assert!(credential.expires_at().is_some());
        assert!(!credential.is_expired_at(Utc::now(), Duration::seconds(5)));
        assert!(!credential.is_expired_at(Utc::now(), Duration::seconds(-5)));
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let credential = Credential::new("supersecrettokenvalue");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("supersecrettokenvalue"));
        assert!(rendered.starts_with("Credential("));
    }

    #[test]
    fn test_bearer_header_value() {
        assert_eq!(Credential::from("abc").bearer(), "Bearer abc");
    }
}
