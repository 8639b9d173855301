//! Wire types exchanged with the AuthServer backend

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Authenticated user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend identifier
    pub id: String,
    /// Display name
    #[serde(alias = "displayName", alias = "username")]
    pub name: String,
    /// Role assigned to the user
    #[serde(default)]
    pub role: String,
}

impl User {
    /// Extract a user from a response body that is either the user itself or
    /// an object wrapping it under `user`.
    pub fn from_body(body: &JsonValue) -> Option<Self> {
        let candidate = body.get("user").unwrap_or(body);
        serde_json::from_value(candidate.clone()).ok()
    }
}

/// Login request
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub identity: String,
    pub secret: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    /// Bearer token for subsequent requests
    #[serde(alias = "accessToken", alias = "token")]
    pub access_token: String,
    /// The authenticated user
    pub user: User,
}

/// Token refresh response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    #[serde(alias = "accessToken", alias = "token")]
    pub access_token: String,
}

/// Result of a session validation round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProbe {
    /// Whether the backend accepted the credential
    pub alive: bool,
    /// User returned with a successful check, when the body contained one
    pub user: Option<User>,
}

/// Administrative resource collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Applications,
    Users,
    Roles,
    Groups,
}

impl ResourceKind {
    /// All resource kinds
    pub const ALL: [Self; 4] = [Self::Applications, Self::Users, Self::Roles, Self::Groups];

    /// Path segment of the collection
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applications => "applications",
            Self::Users => "users",
            Self::Roles => "roles",
            Self::Groups => "groups",
        }
    }

    /// Collection path
    pub fn collection_path(self) -> String {
        format!("/api/{}", self.as_str())
    }

    /// Path of a single item
    pub fn item_path(self, id: &str) -> String {
        format!("/api/{}/{id}", self.as_str())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.as_str() == normalized || kind.as_str().trim_end_matches('s') == normalized
            })
            .ok_or_else(|| {
                format!("unknown resource kind '{s}' (expected applications, users, roles or groups)")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_from_bare_and_wrapped_body() {
        let bare = json!({"id": "u1", "name": "Ada", "role": "admin"});
        let wrapped = json!({"user": {"id": "u1", "displayName": "Ada", "role": "admin"}});

        let expected = User {
            id: "u1".into(),
            name: "Ada".into(),
            role: "admin".into(),
        };
        assert_eq!(User::from_body(&bare), Some(expected.clone()));
        assert_eq!(User::from_body(&wrapped), Some(expected));
        assert_eq!(User::from_body(&json!({"ok": true})), None);
    }

    #[test]
    fn test_authenticate_response_accepts_camel_case_token() {
        let response: AuthenticateResponse = serde_json::from_value(json!({
            "accessToken": "abc",
            "user": {"id": "u1", "name": "Ada"}
        }))
        .unwrap();
        assert_eq!(response.access_token, "abc");
        assert_eq!(response.user.role, "");
    }

    #[test]
    fn test_resource_kind_parsing() {
        assert_eq!("users".parse::<ResourceKind>(), Ok(ResourceKind::Users));
        assert_eq!("Role".parse::<ResourceKind>(), Ok(ResourceKind::Roles));
        assert_eq!(
            "application".parse::<ResourceKind>(),
            Ok(ResourceKind::Applications)
        );
        assert!("tenants".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(ResourceKind::Groups.collection_path(), "/api/groups");
        assert_eq!(ResourceKind::Users.item_path("42"), "/api/users/42");
    }
}
