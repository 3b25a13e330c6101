use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored user identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: String,
    /// Login name
    pub username: String,
    /// Email address, also carried as the token's name claim
    pub email: String,
    /// PHC-formatted password hash, owned by the user store
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Public URL of the profile photo
    pub profile_photo_url: String,
    /// Latest refresh token issued at login
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
    /// Role names, joined into the token's role claim
    pub roles: Vec<String>,
    /// Additional claims copied into every access token
    pub claims: BTreeMap<String, String>,
    /// Consecutive failed password checks
    pub access_failed_count: u32,
    /// Account is locked until this instant
    pub lockout_end: Option<DateTime<Utc>>,
    pub lockout_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user with a fresh identifier
    pub fn new(username: String, email: String, profile_photo_url: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            email,
            password_hash: String::new(),
            profile_photo_url,
            refresh_token: None,
            roles: Vec::new(),
            claims: BTreeMap::new(),
            access_failed_count: 0,
            lockout_end: None,
            lockout_enabled: true,
            created_at: Utc::now(),
        }
    }

    /// Check whether the account is locked at the given instant
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout_enabled && self.lockout_end.map_or(false, |end| end > now)
    }
}

/// A single validation failure reported to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityError {
    pub code: String,
    pub description: String,
}

impl IdentityError {
    pub fn new(code: &str, description: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            description: description.into(),
        }
    }

    pub fn required_field(field: &str) -> Self {
        Self::new("RequiredField", format!("The {} field is required.", field))
    }

    pub fn invalid_user_name(username: &str) -> Self {
        Self::new(
            "InvalidUserName",
            format!("Username '{}' is invalid, can only contain letters or digits.", username),
        )
    }

    pub fn duplicate_user_name(username: &str) -> Self {
        Self::new(
            "DuplicateUserName",
            format!("Username '{}' is already taken.", username),
        )
    }

    pub fn invalid_email(email: &str) -> Self {
        Self::new("InvalidEmail", format!("Email '{}' is invalid.", email))
    }

    pub fn duplicate_email(email: &str) -> Self {
        Self::new("DuplicateEmail", format!("Email '{}' is already taken.", email))
    }

    pub fn password_too_short(length: usize) -> Self {
        Self::new(
            "PasswordTooShort",
            format!("Passwords must be at least {} characters.", length),
        )
    }

    pub fn password_requires_upper() -> Self {
        Self::new(
            "PasswordRequiresUpper",
            "Passwords must have at least one uppercase ('A'-'Z').",
        )
    }

    pub fn password_requires_lower() -> Self {
        Self::new(
            "PasswordRequiresLower",
            "Passwords must have at least one lowercase ('a'-'z').",
        )
    }

    pub fn password_requires_digit() -> Self {
        Self::new(
            "PasswordRequiresDigit",
            "Passwords must have at least one digit ('0'-'9').",
        )
    }

    pub fn password_requires_non_alphanumeric() -> Self {
        Self::new(
            "PasswordRequiresNonAlphanumeric",
            "Passwords must have at least one non alphanumeric character.",
        )
    }

    pub fn password_requires_unique_chars(count: usize) -> Self {
        Self::new(
            "PasswordRequiresUniqueChars",
            format!("Passwords must use at least {} different characters.", count),
        )
    }
}
