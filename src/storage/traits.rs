//! Abstract storage interfaces for pluggable backends
//!
//! The gateway never talks to a database or blob service directly. It goes
//! through these two traits, so a deployment can swap the in-process
//! implementations for real providers without touching the request flow.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::auth::user::User;
use crate::error::Result;

/// Outcome of a password check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInResult {
    Success,
    /// Password did not match
    Failed,
    /// Account is locked, the password was not checked or this failure locked it
    LockedOut,
}

/// User data storage interface
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a new user with the given password.
    ///
    /// Rejected input comes back as `AuthGatewayError::Validation`.
    async fn create(&self, user: User, password: &str) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Check a password, honouring an active lockout. Failures only count
    /// towards a new lockout when the store's policy says so.
    async fn check_password(&self, user: &User, password: &str) -> Result<SignInResult>;

    /// Persist the profile fields (username, email, photo) of an existing user
    async fn update(&self, user: &User) -> Result<()>;

    /// Replace the stored refresh token, leaving every other field alone
    async fn set_refresh_token(&self, user: &User, refresh_token: &str) -> Result<()>;

    async fn get_roles(&self, user: &User) -> Result<Vec<String>>;

    async fn get_claims(&self, user: &User) -> Result<BTreeMap<String, String>>;
}

/// Blob storage interface for profile photos
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the bytes under `name`, returning the public URL of the object
    async fn upload(&self, data: Vec<u8>, name: &str) -> Result<String>;
}
