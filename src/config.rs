//! Server configuration module
//! Loads signing, storage and sign-in policy parameters from the environment

use crate::constants::{
    DEFAULT_ACCESS_TOKEN_MINUTES, DEFAULT_HOST, DEFAULT_JWT_AUDIENCE, DEFAULT_JWT_ISSUER,
    DEFAULT_LOCKOUT_MAX_ATTEMPTS, DEFAULT_LOCKOUT_MINUTES, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_MIN_AUTH_MILLIS, DEFAULT_OBJECT_STORE_PUBLIC_URL, DEFAULT_OBJECT_STORE_ROOT,
    DEFAULT_PHOTO_CONTAINER, DEFAULT_PORT, DEFAULT_PROFILE_PHOTO_URL,
};
use crate::error::{AuthGatewayError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Symmetric key for HS256 token signing/validation
    pub jwt_key: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    /// Access token lifetime in minutes
    pub access_token_minutes: i64,
    /// Photo URL stored when registration carries no photo
    pub default_photo_url: String,
    /// Directory the local object store writes into
    pub object_store_root: PathBuf,
    /// Base URL the stored objects are served from
    pub object_store_public_url: String,
    pub object_store_container: String,
    /// Largest accepted multipart body
    pub max_upload_bytes: u64,
    /// Count failed password checks towards a lockout
    pub lockout_on_failure: bool,
    /// Failed password checks before lockout
    pub lockout_max_attempts: u32,
    pub lockout_minutes: i64,
    /// Floor for the duration of a rejected login
    pub min_auth_duration: Duration,
    /// Development mode (relaxes production warnings)
    pub development_mode: bool,
    /// TLS configuration
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
    pub enable_tls: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        panic!("ServerConfig::default() is not allowed for security reasons. Use ServerConfig::from_env() instead.");
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(false)
}

impl ServerConfig {
    /// Create a test configuration - DANGEROUS: Only for testing!
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            jwt_key: "test-jwt-key-only-for-unit-tests-never-use-in-production".to_string(),
            jwt_issuer: DEFAULT_JWT_ISSUER.to_string(),
            jwt_audience: DEFAULT_JWT_AUDIENCE.to_string(),
            access_token_minutes: DEFAULT_ACCESS_TOKEN_MINUTES,
            default_photo_url: DEFAULT_PROFILE_PHOTO_URL.to_string(),
            object_store_root: PathBuf::from(DEFAULT_OBJECT_STORE_ROOT),
            object_store_public_url: DEFAULT_OBJECT_STORE_PUBLIC_URL.to_string(),
            object_store_container: DEFAULT_PHOTO_CONTAINER.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            lockout_on_failure: false,
            lockout_max_attempts: DEFAULT_LOCKOUT_MAX_ATTEMPTS,
            lockout_minutes: DEFAULT_LOCKOUT_MINUTES,
            min_auth_duration: Duration::from_millis(0),
            development_mode: true,
            tls_cert_path: None,
            tls_key_path: None,
            enable_tls: false,
        }
    }

    /// Validate that the signing key meets security requirements
    fn validate_jwt_key(key: &str) -> Result<()> {
        if key.len() < 32 {
            return Err(AuthGatewayError::ConfigError(
                "JWT signing key must be at least 32 characters long".to_string(),
            ));
        }

        // Check for insecure default or example values
        let insecure_patterns = [
            "your-secret-key",
            "change-this",
            "changeme",
            "test-secret",
            "default",
            "secret",
            "password",
            "12345",
        ];

        for pattern in &insecure_patterns {
            if key.to_lowercase().contains(pattern) {
                return Err(AuthGatewayError::ConfigError(format!(
                    "JWT signing key contains insecure pattern '{}'. Please use a secure random key generated with: openssl rand -base64 32",
                    pattern
                )));
            }
        }

        if key.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AuthGatewayError::ConfigError(
                "JWT signing key should contain mixed characters (letters, numbers, symbols)"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("AUTH_GATEWAY_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env_or("AUTH_GATEWAY_PORT", DEFAULT_PORT);

        let jwt_key = env::var("AUTH_GATEWAY_JWT_KEY")
            .or_else(|_| env::var("JWT_KEY"))
            .map_err(|_| {
                AuthGatewayError::ConfigError(
                    "JWT_KEY environment variable is required for token signing. \
                     Generate one with: openssl rand -base64 32"
                        .to_string(),
                )
            })?;
        Self::validate_jwt_key(&jwt_key)?;

        let jwt_issuer =
            env::var("AUTH_GATEWAY_JWT_ISSUER").unwrap_or(DEFAULT_JWT_ISSUER.to_string());
        let jwt_audience =
            env::var("AUTH_GATEWAY_JWT_AUDIENCE").unwrap_or(DEFAULT_JWT_AUDIENCE.to_string());

        let access_token_minutes =
            env_or("AUTH_GATEWAY_ACCESS_TOKEN_MINUTES", DEFAULT_ACCESS_TOKEN_MINUTES);
        if access_token_minutes <= 0 {
            return Err(AuthGatewayError::ConfigError(
                "AUTH_GATEWAY_ACCESS_TOKEN_MINUTES must be a positive number of minutes"
                    .to_string(),
            ));
        }

        let default_photo_url = env::var("AUTH_GATEWAY_DEFAULT_PHOTO_URL")
            .unwrap_or(DEFAULT_PROFILE_PHOTO_URL.to_string());
        let object_store_root = PathBuf::from(
            env::var("AUTH_GATEWAY_OBJECT_STORE_ROOT")
                .unwrap_or(DEFAULT_OBJECT_STORE_ROOT.to_string()),
        );
        let object_store_public_url = env::var("AUTH_GATEWAY_OBJECT_STORE_PUBLIC_URL")
            .unwrap_or(DEFAULT_OBJECT_STORE_PUBLIC_URL.to_string());
        let object_store_container = env::var("AUTH_GATEWAY_OBJECT_STORE_CONTAINER")
            .unwrap_or(DEFAULT_PHOTO_CONTAINER.to_string());

        let max_upload_bytes = env_or("AUTH_GATEWAY_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES);
        let lockout_max_attempts =
            env_or("AUTH_GATEWAY_LOCKOUT_MAX_ATTEMPTS", DEFAULT_LOCKOUT_MAX_ATTEMPTS);
        if lockout_max_attempts == 0 {
            return Err(AuthGatewayError::ConfigError(
                "AUTH_GATEWAY_LOCKOUT_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        let lockout_on_failure = env_flag("AUTH_GATEWAY_LOCKOUT_ON_FAILURE");
        let lockout_minutes = env_or("AUTH_GATEWAY_LOCKOUT_MINUTES", DEFAULT_LOCKOUT_MINUTES);
        let min_auth_millis = env_or("AUTH_GATEWAY_MIN_AUTH_MILLIS", DEFAULT_MIN_AUTH_MILLIS);

        let development_mode = env_flag("AUTH_GATEWAY_DEVELOPMENT_MODE");

        // TLS configuration
        let enable_tls = env_flag("AUTH_GATEWAY_ENABLE_TLS");
        let tls_cert_path = env::var("AUTH_GATEWAY_TLS_CERT_PATH").ok();
        let tls_key_path = env::var("AUTH_GATEWAY_TLS_KEY_PATH").ok();

        if enable_tls {
            match (&tls_cert_path, &tls_key_path) {
                (Some(cert_path), Some(key_path)) => {
                    if !std::path::Path::new(cert_path).exists() {
                        return Err(AuthGatewayError::ConfigError(format!(
                            "TLS certificate file does not exist: {}",
                            cert_path
                        )));
                    }
                    if !std::path::Path::new(key_path).exists() {
                        return Err(AuthGatewayError::ConfigError(format!(
                            "TLS private key file does not exist: {}",
                            key_path
                        )));
                    }
                }
                _ => {
                    return Err(AuthGatewayError::ConfigError(
                        "TLS is enabled but AUTH_GATEWAY_TLS_CERT_PATH or AUTH_GATEWAY_TLS_KEY_PATH is not set".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            host,
            port,
            jwt_key,
            jwt_issuer,
            jwt_audience,
            access_token_minutes,
            default_photo_url,
            object_store_root,
            object_store_public_url,
            object_store_container,
            max_upload_bytes,
            lockout_on_failure,
            lockout_max_attempts,
            lockout_minutes,
            min_auth_duration: Duration::from_millis(min_auth_millis),
            development_mode,
            tls_cert_path,
            tls_key_path,
            enable_tls,
        })
    }

    /// Access token lifetime as a chrono duration
    pub fn access_token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_minutes)
    }
}
