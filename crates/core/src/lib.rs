//! Core types for the AuthServer admin console: the bearer credential, its
//! store, persisted session storage, configuration and tracing setup.

pub mod config;
pub mod credential;
pub mod error;
pub mod storage;
pub mod token_store;
pub mod tracing;

pub use config::{AdminConfig, AuthConfig, EndpointConfig};
pub use credential::Credential;
pub use error::{CoreError, CoreResult};
pub use storage::{CredentialStorage, FileStorage, MemoryStorage};
pub use token_store::{TokenSnapshot, TokenStore};
