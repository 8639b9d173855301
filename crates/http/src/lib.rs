//! HTTP layer of the AuthServer admin console
//!
//! - [`client`]: typed client for the credential-management endpoints
//! - [`gateway`]: the single path for authenticated calls, with coalesced 401 recovery
//! - [`types`]: wire types shared by both

pub mod client;
pub mod gateway;
pub mod resources;
pub mod types;

pub use client::{ClientBuilder, PublicAdminClient, error::ClientError};
pub use gateway::{
    ApiError, AuthGateway, AuthGatewayBuilder, CredentialRefresher, EndpointRefresher, NoRefresh,
    SessionExpiryHandler,
};
pub use types::{ResourceKind, SessionProbe, User};
