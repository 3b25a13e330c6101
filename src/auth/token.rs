use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::REFRESH_TOKEN_BYTES;
use crate::error::{AuthGatewayError, Result};

/// Claim names the issuer sets itself; extra claims may not override them
pub const RESERVED_CLAIMS: &[&str] = &[
    "sub", "name", "userId", "role", "iss", "aud", "iat", "nbf", "exp",
];

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Email address of the user
    pub name: String,
    /// User ID, duplicated under the name clients read
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Comma-joined role names
    pub role: String,
    pub iss: String,
    pub aud: String,
    /// Issued at (as UTC timestamp)
    pub iat: u64,
    /// Not before (as UTC timestamp)
    pub nbf: u64,
    /// Expiration time (as UTC timestamp)
    pub exp: u64,
    /// Any further claims held by the user store, passed through unchanged
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Claims {
    /// Role names carried by the token
    pub fn roles(&self) -> Vec<String> {
        self.role
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        (Utc::now().timestamp() as u64) >= self.exp
    }
}

/// Access token plus the opaque refresh token handed out at login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Caller identity recovered from a verified access token
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        let roles = claims.roles();
        Self {
            user_id: claims.user_id,
            email: claims.name,
            roles,
        }
    }
}

/// Signs and verifies access tokens
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenManager {
    /// Creates a token manager for a symmetric key, issuer and audience
    pub fn new(secret: &str, issuer: &str, audience: &str, lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Builds the claim set for a user, valid from now for the configured lifetime
    pub fn build_claims(
        &self,
        user_id: &str,
        email: &str,
        roles: &[String],
        extra: &BTreeMap<String, String>,
    ) -> Claims {
        let now = Utc::now().timestamp() as u64;
        let exp = now + self.lifetime.num_seconds().max(0) as u64;

        let mut passthrough = BTreeMap::new();
        for (key, value) in extra {
            if RESERVED_CLAIMS.contains(&key.as_str()) {
                log::warn!("Dropping extra claim '{}' for user {}: name is reserved", key, user_id);
                continue;
            }
            passthrough.insert(key.clone(), serde_json::Value::String(value.clone()));
        }

        Claims {
            sub: user_id.to_string(),
            name: email.to_string(),
            user_id: user_id.to_string(),
            role: roles.join(","),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            nbf: now,
            exp,
            extra: passthrough,
        }
    }

    /// Builds and signs an access token for a user
    pub fn issue_token(
        &self,
        user_id: &str,
        email: &str,
        roles: &[String],
        extra: &BTreeMap<String, String>,
    ) -> Result<String> {
        let claims = self.build_claims(user_id, email, roles, extra);
        self.generate_token(&claims)
    }

    /// Signs an already built claim set
    pub fn generate_token(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthGatewayError::AuthError(format!("Failed to generate token: {}", e)))
    }

    /// Validates signature, issuer, audience and lifetime, then decodes
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthGatewayError::AuthError(format!("Invalid token: {}", e)))
    }

    /// Extracts claims from a token string
    pub fn get_claims(&self, token: &str) -> Result<Claims> {
        let token_data = self.validate_token(token)?;
        Ok(token_data.claims)
    }
}

/// New opaque refresh token from the OS random source
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Extracts bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<String> {
    let (scheme, token) = auth_header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
