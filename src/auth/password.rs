//! Password policy and Argon2id hashing

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::collections::HashSet;

use crate::auth::user::IdentityError;
use crate::error::{AuthGatewayError, Result};

/// Rules a new password must satisfy
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub required_unique_chars: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: 6,
            required_unique_chars: 5,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: false,
            require_non_alphanumeric: false,
        }
    }
}

impl PasswordPolicy {
    /// Returns one error per violated rule, empty when the password is acceptable
    pub fn validate(&self, password: &str) -> Vec<IdentityError> {
        let mut errors = Vec::new();

        if password.chars().count() < self.required_length {
            errors.push(IdentityError::password_too_short(self.required_length));
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_alphanumeric()) {
            errors.push(IdentityError::password_requires_non_alphanumeric());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push(IdentityError::password_requires_digit());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            errors.push(IdentityError::password_requires_lower());
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            errors.push(IdentityError::password_requires_upper());
        }

        let unique: HashSet<char> = password.chars().collect();
        if unique.len() < self.required_unique_chars {
            errors.push(IdentityError::password_requires_unique_chars(
                self.required_unique_chars,
            ));
        }

        errors
    }
}

/// Hash a password into a PHC string with a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// `Ok(false)` means the password does not match; a malformed hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        AuthGatewayError::StorageError(format!("Stored password hash is malformed: {}", e))
    })?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(errors: &[IdentityError]) -> Vec<&str> {
        errors.iter().map(|e| e.code.as_str()).collect()
    }

    #[test]
    fn accepts_password_meeting_default_policy() {
        assert!(PasswordPolicy::default().validate("Secret1").is_empty());
        assert!(PasswordPolicy::default().validate("Abcdef").is_empty());
    }

    #[test]
    fn reports_every_violated_rule() {
        let errors = PasswordPolicy::default().validate("aaa");
        assert_eq!(
            codes(&errors),
            vec![
                "PasswordTooShort",
                "PasswordRequiresUpper",
                "PasswordRequiresUniqueChars"
            ]
        );
    }

    #[test]
    fn digits_and_symbols_are_optional_by_default() {
        let policy = PasswordPolicy::default();
        assert!(policy.validate("Abcdefg").is_empty());

        let strict = PasswordPolicy {
            require_digit: true,
            require_non_alphanumeric: true,
            ..PasswordPolicy::default()
        };
        let errors = strict.validate("Abcdefg");
        assert_eq!(
            codes(&errors),
            vec!["PasswordRequiresNonAlphanumeric", "PasswordRequiresDigit"]
        );
    }

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("Hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Hunter22", &hash).unwrap());
        assert!(!verify_password("hunter22", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = hash_password("Hunter22").unwrap();
        let b = hash_password("Hunter22").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("Hunter22", "not-a-hash").is_err());
    }
}
