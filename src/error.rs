use std::error::Error;
use std::fmt;

use crate::auth::user::IdentityError;

#[derive(Debug)]
pub enum AuthGatewayError {
    // Input rejected by the gateway or the user store
    Validation(Vec<IdentityError>),
    BadRequest(String),

    // Auth errors
    Unauthorized(String),
    AuthError(String),

    // Storage errors
    StorageError(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for AuthGatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(errors) => {
                let descriptions: Vec<&str> =
                    errors.iter().map(|e| e.description.as_str()).collect();
                write!(f, "Validation failed: {}", descriptions.join("; "))
            }
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for AuthGatewayError {}

impl From<std::io::Error> for AuthGatewayError {
    fn from(err: std::io::Error) -> Self {
        AuthGatewayError::StorageError(format!("I/O failure: {}", err))
    }
}

impl From<argon2::password_hash::Error> for AuthGatewayError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthGatewayError::StorageError(format!("Password hashing failed: {}", err))
    }
}

// Generic result type for the gateway
pub type Result<T> = std::result::Result<T, AuthGatewayError>;
