//! Tracing setup shared by the console binaries

pub mod config;
pub mod init;

pub use config::InstrumentationConfig;
pub use init::init_tracing;
