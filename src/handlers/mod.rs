//! Request handlers for the HTTP endpoints

pub mod auth;

// Re-export the route builder
pub use auth::{routes, AppState};
