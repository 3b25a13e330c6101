//! Auth Gateway - credential registration, login and bearer token issuance
//!
//! This library provides the credential gateway, the access token issuer,
//! the pluggable user and object store backends, and the warp routes that
//! expose them over HTTP.

pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod security;
pub mod security_logger;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;
