//! Security utilities for the HTTP layer

pub mod headers;
pub mod timing;

pub use headers::with_api_security_headers;
pub use timing::{add_auth_delay, AuthTimer};
