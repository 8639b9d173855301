//! Console configuration
//!
//! Configuration is layered: built-in defaults, then an optional file (TOML or
//! YAML, detected from the extension), then environment variables prefixed with
//! `AUTHSERVER_ADMIN` using `__` as the nesting separator, e.g.
//! `AUTHSERVER_ADMIN__ENDPOINTS__REFRESH=/auth/token/refresh`.

use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Authentication constants
pub struct AuthConfig;

impl AuthConfig {
    /// Storage key for the bearer credential
    pub const TOKEN_KEY: &'static str = "auth_token";

    /// Storage key for the cached user profile
    pub const USER_KEY: &'static str = "auth_user";

    /// Query parameter carrying the path to return to after login
    pub const RETURN_TO_PARAM: &'static str = "returnTo";

    /// Query parameter flagging that the previous session expired
    pub const EXPIRED_PARAM: &'static str = "expired";
}

/// Environment variable prefix
pub const ENV_PREFIX: &str = "AUTHSERVER_ADMIN";

/// Top-level console configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Base URL of the AuthServer backend
    pub base_url: String,
    /// Transport timeout for every request, in seconds
    pub timeout_secs: u64,
    /// Attempt a token refresh on 401 before expiring the session
    pub refresh_enabled: bool,
    /// Clock skew allowed when checking a token's embedded expiry, in seconds
    pub expiry_leeway_secs: i64,
    /// Route of the login screen used for redirects
    pub login_route: String,
    /// Backend endpoint paths
    pub endpoints: EndpointConfig,
    /// Directory for persisted session data and logs
    pub data_dir: Option<PathBuf>,
    /// Log level filter used when `RUST_LOG` is not set
    pub log_level: String,
}

/// Paths of the authentication endpoints, relative to `base_url`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub authenticate: String,
    pub logout: String,
    pub refresh: String,
    pub validate: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            refresh_enabled: true,
            expiry_leeway_secs: 5,
            login_route: "/login".to_string(),
            endpoints: EndpointConfig::default(),
            data_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            authenticate: "/auth/authenticate".to_string(),
            logout: "/auth/logout".to_string(),
            refresh: "/auth/refresh".to_string(),
            validate: "/auth/session".to_string(),
        }
    }
}

impl AdminConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value cannot be parsed
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Write this configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CoreError::serialization_error(e.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Transport timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Leeway applied to embedded token expiry
    pub fn expiry_leeway(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.expiry_leeway_secs)
    }

    /// Directory for persisted session data
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("authserver-admin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdminConfig::default();
        assert_eq!(config.endpoints.authenticate, "/auth/authenticate");
        assert_eq!(config.endpoints.refresh, "/auth/refresh");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.refresh_enabled);
        assert!(config.data_dir().ends_with("authserver-admin"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = AdminConfig::load(None).unwrap();
        assert_eq!(config.login_route, AdminConfig::default().login_route);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.toml");
        std::fs::write(
            &path,
            r#"
base_url = "https://auth.example.com"
refresh_enabled = false

[endpoints]
validate = "/validatesession"
"#,
        )
        .unwrap();

        let config = AdminConfig::load(Some(&path)).unwrap();
        assert_eq!(config.base_url, "https://auth.example.com");
        assert!(!config.refresh_enabled);
        assert_eq!(config.endpoints.validate, "/validatesession");
        assert_eq!(config.endpoints.logout, "/auth/logout");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("admin.toml");

        let config = AdminConfig {
            timeout_secs: 7,
            data_dir: Some(dir.path().to_path_buf()),
            ..AdminConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = AdminConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.timeout_secs, 7);
        assert_eq!(loaded.data_dir(), dir.path());
    }
}
