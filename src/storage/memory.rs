//! In-memory user store for development and testing
//!
//! Keeps every identity in a map guarded by a tokio `RwLock`, hashes
//! passwords with Argon2id and enforces the password and lockout policies.
//! State is lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::{SignInResult, UserStore};
use crate::auth::password::{self, PasswordPolicy};
use crate::auth::user::{IdentityError, User};
use crate::constants::{DEFAULT_LOCKOUT_MAX_ATTEMPTS, DEFAULT_LOCKOUT_MINUTES};
use crate::error::{AuthGatewayError, Result};

/// Consecutive failures allowed before an account is locked, and for how long.
///
/// Failed checks are only counted when `lockout_on_failure` is set. Without
/// it an existing lockout is still honoured, but nobody can lock an account
/// just by guessing wrong passwords for it.
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    pub allowed_for_new_users: bool,
    pub lockout_on_failure: bool,
    pub max_failed_attempts: u32,
    pub duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            allowed_for_new_users: true,
            lockout_on_failure: false,
            max_failed_attempts: DEFAULT_LOCKOUT_MAX_ATTEMPTS,
            duration: Duration::minutes(DEFAULT_LOCKOUT_MINUTES),
        }
    }
}

/// In-memory user storage
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    password_policy: PasswordPolicy,
    lockout_policy: LockoutPolicy,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::with_policies(PasswordPolicy::default(), LockoutPolicy::default())
    }

    pub fn with_policies(password_policy: PasswordPolicy, lockout_policy: LockoutPolicy) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            password_policy,
            lockout_policy,
        }
    }

    /// Grant a role to a user
    pub async fn add_to_role(&self, user_id: &str, role: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| AuthGatewayError::StorageError(format!("User not found: {}", user_id)))?;
        if !user.roles.iter().any(|r| r == role) {
            user.roles.push(role.to_string());
        }
        Ok(())
    }

    /// Attach an additional claim to a user
    pub async fn add_claim(&self, user_id: &str, key: &str, value: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| AuthGatewayError::StorageError(format!("User not found: {}", user_id)))?;
        user.claims.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Lock a user out until the given instant, `None` lifts the lockout
    pub async fn set_lockout_end(&self, user_id: &str, until: Option<DateTime<Utc>>) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| AuthGatewayError::StorageError(format!("User not found: {}", user_id)))?;
        user.lockout_end = until;
        Ok(())
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Username and email checks shared by create and update
    fn validate_profile(
        users: &HashMap<String, User>,
        candidate: &User,
        errors: &mut Vec<IdentityError>,
    ) {
        if !is_valid_username(&candidate.username) {
            errors.push(IdentityError::invalid_user_name(&candidate.username));
        } else if users.values().any(|u| {
            u.id != candidate.id && u.username.eq_ignore_ascii_case(&candidate.username)
        }) {
            errors.push(IdentityError::duplicate_user_name(&candidate.username));
        }

        if !is_valid_email(&candidate.email) {
            errors.push(IdentityError::invalid_email(&candidate.email));
        } else if users
            .values()
            .any(|u| u.id != candidate.id && u.email.eq_ignore_ascii_case(&candidate.email))
        {
            errors.push(IdentityError::duplicate_email(&candidate.email));
        }
    }
}

fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-._@+".contains(c))
}

fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, mut user: User, password: &str) -> Result<()> {
        let mut errors = Vec::new();
        {
            let users = self.users.read().await;
            Self::validate_profile(&users, &user, &mut errors);
        }
        errors.extend(self.password_policy.validate(password));
        if !errors.is_empty() {
            return Err(AuthGatewayError::Validation(errors));
        }

        user.password_hash = password::hash_password(password)?;
        user.lockout_enabled = self.lockout_policy.allowed_for_new_users;

        let mut users = self.users.write().await;
        // Re-check under the write lock, another registration may have won the race
        let mut errors = Vec::new();
        Self::validate_profile(&users, &user, &mut errors);
        if !errors.is_empty() {
            return Err(AuthGatewayError::Validation(errors));
        }

        log::debug!("Created user {} ({})", user.username, user.id);
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn check_password(&self, user: &User, password: &str) -> Result<SignInResult> {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| AuthGatewayError::StorageError(format!("User not found: {}", user.id)))?;

        let now = Utc::now();
        if stored.is_locked_out(now) {
            return Ok(SignInResult::LockedOut);
        }

        if password::verify_password(password, &stored.password_hash)? {
            stored.access_failed_count = 0;
            stored.lockout_end = None;
            return Ok(SignInResult::Success);
        }

        if !stored.lockout_enabled || !self.lockout_policy.lockout_on_failure {
            return Ok(SignInResult::Failed);
        }

        stored.access_failed_count += 1;
        if stored.access_failed_count >= self.lockout_policy.max_failed_attempts {
            stored.access_failed_count = 0;
            stored.lockout_end = Some(now + self.lockout_policy.duration);
            log::warn!("User {} locked out until {:?}", stored.id, stored.lockout_end);
            return Ok(SignInResult::LockedOut);
        }

        Ok(SignInResult::Failed)
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(AuthGatewayError::StorageError(format!("User not found: {}", user.id)));
        }

        let mut errors = Vec::new();
        Self::validate_profile(&users, user, &mut errors);
        if !errors.is_empty() {
            return Err(AuthGatewayError::Validation(errors));
        }

        // Credentials, refresh token and lockout state stay as the store last wrote them
        if let Some(stored) = users.get_mut(&user.id) {
            stored.username = user.username.clone();
            stored.email = user.email.clone();
            stored.profile_photo_url = user.profile_photo_url.clone();
        }
        Ok(())
    }

    async fn set_refresh_token(&self, user: &User, refresh_token: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| AuthGatewayError::StorageError(format!("User not found: {}", user.id)))?;
        stored.refresh_token = Some(refresh_token.to_string());
        Ok(())
    }

    async fn get_roles(&self, user: &User) -> Result<Vec<String>> {
        let users = self.users.read().await;
        Ok(users.get(&user.id).map(|u| u.roles.clone()).unwrap_or_default())
    }

    async fn get_claims(&self, user: &User) -> Result<BTreeMap<String, String>> {
        let users = self.users.read().await;
        Ok(users.get(&user.id).map(|u| u.claims.clone()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> User {
        User::new(username.to_string(), email.to_string(), "defaultURL".to_string())
    }

    fn codes(err: AuthGatewayError) -> Vec<String> {
        match err {
            AuthGatewayError::Validation(errors) => errors.into_iter().map(|e| e.code).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn create_and_find() {
        let store = MemoryUserStore::new();
        let user = new_user("alice", "alice@example.com");
        let id = user.id.clone();
        store.create(user, "Secret1").await.unwrap();

        let by_name = store.find_by_username("ALICE").await.unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert!(by_name.password_hash.starts_with("$argon2id$"));
        assert!(store.find_by_email("alice@example.com").await.unwrap().is_some());
        assert!(store.find_by_id(&id).await.unwrap().is_some());
        assert!(store.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_and_weak_password_are_reported_together() {
        let store = MemoryUserStore::new();
        store
            .create(new_user("alice", "alice@example.com"), "Secret1")
            .await
            .unwrap();

        let err = store
            .create(new_user("Alice", "other@example.com"), "weak")
            .await
            .unwrap_err();
        let codes = codes(err);
        assert!(codes.contains(&"DuplicateUserName".to_string()));
        assert!(codes.contains(&"PasswordTooShort".to_string()));
        assert!(codes.contains(&"PasswordRequiresUpper".to_string()));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn invalid_username_and_email() {
        let store = MemoryUserStore::new();
        let err = store
            .create(new_user("bad name", "not-an-email"), "Secret1")
            .await
            .unwrap_err();
        assert_eq!(codes(err), vec!["InvalidUserName", "InvalidEmail"]);
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = MemoryUserStore::new();
        store
            .create(new_user("alice", "shared@example.com"), "Secret1")
            .await
            .unwrap();
        let err = store
            .create(new_user("bob", "SHARED@example.com"), "Secret1")
            .await
            .unwrap_err();
        assert_eq!(codes(err), vec!["DuplicateEmail"]);
    }

    #[tokio::test]
    async fn lockout_after_repeated_failures() {
        let store = MemoryUserStore::with_policies(
            PasswordPolicy::default(),
            LockoutPolicy {
                allowed_for_new_users: true,
                lockout_on_failure: true,
                max_failed_attempts: 3,
                duration: Duration::minutes(5),
            },
        );
        store
            .create(new_user("alice", "alice@example.com"), "Secret1")
            .await
            .unwrap();
        let user = store.find_by_username("alice").await.unwrap().unwrap();

        assert_eq!(store.check_password(&user, "nope").await.unwrap(), SignInResult::Failed);
        assert_eq!(store.check_password(&user, "nope").await.unwrap(), SignInResult::Failed);
        assert_eq!(store.check_password(&user, "nope").await.unwrap(), SignInResult::LockedOut);
        // Correct password is refused while locked
        assert_eq!(
            store.check_password(&user, "Secret1").await.unwrap(),
            SignInResult::LockedOut
        );
    }

    #[tokio::test]
    async fn failures_do_not_lock_by_default() {
        let store = MemoryUserStore::new();
        store
            .create(new_user("alice", "alice@example.com"), "Secret1")
            .await
            .unwrap();
        let user = store.find_by_username("alice").await.unwrap().unwrap();

        for _ in 0..10 {
            assert_eq!(store.check_password(&user, "nope").await.unwrap(), SignInResult::Failed);
        }
        assert_eq!(
            store.check_password(&user, "Secret1").await.unwrap(),
            SignInResult::Success
        );

        store
            .set_lockout_end(&user.id, Some(Utc::now() + Duration::minutes(5)))
            .await
            .unwrap();
        assert_eq!(
            store.check_password(&user, "Secret1").await.unwrap(),
            SignInResult::LockedOut
        );
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let store = MemoryUserStore::new();
        store
            .create(new_user("alice", "alice@example.com"), "Secret1")
            .await
            .unwrap();
        let user = store.find_by_username("alice").await.unwrap().unwrap();

        store.check_password(&user, "nope").await.unwrap();
        assert_eq!(
            store.check_password(&user, "Secret1").await.unwrap(),
            SignInResult::Success
        );
        let stored = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.access_failed_count, 0);
    }

    #[tokio::test]
    async fn lockout_disabled_for_new_users() {
        let store = MemoryUserStore::with_policies(
            PasswordPolicy::default(),
            LockoutPolicy {
                allowed_for_new_users: false,
                lockout_on_failure: true,
                max_failed_attempts: 1,
                duration: Duration::minutes(5),
            },
        );
        store
            .create(new_user("alice", "alice@example.com"), "Secret1")
            .await
            .unwrap();
        let user = store.find_by_username("alice").await.unwrap().unwrap();
        for _ in 0..3 {
            assert_eq!(store.check_password(&user, "nope").await.unwrap(), SignInResult::Failed);
        }
        assert_eq!(
            store.check_password(&user, "Secret1").await.unwrap(),
            SignInResult::Success
        );
    }

    #[tokio::test]
    async fn update_keeps_credentials_and_rejects_taken_username() {
        let store = MemoryUserStore::new();
        store
            .create(new_user("alice", "alice@example.com"), "Secret1")
            .await
            .unwrap();
        store
            .create(new_user("bob", "bob@example.com"), "Secret1")
            .await
            .unwrap();

        let mut alice = store.find_by_username("alice").await.unwrap().unwrap();
        let original_hash = alice.password_hash.clone();
        store.set_refresh_token(&alice, "r1").await.unwrap();

        // A stale copy must not overwrite the hash or the newer refresh token
        alice.password_hash = String::new();
        alice.refresh_token = Some("stale".to_string());
        alice.email = "alice@new.example.com".to_string();
        store.update(&alice).await.unwrap();

        let stored = store.find_by_id(&alice.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, original_hash);
        assert_eq!(stored.refresh_token.as_deref(), Some("r1"));
        assert_eq!(stored.email, "alice@new.example.com");

        alice.username = "bob".to_string();
        let err = store.update(&alice).await.unwrap_err();
        assert_eq!(codes(err), vec!["DuplicateUserName"]);
    }

    #[tokio::test]
    async fn roles_and_claims() {
        let store = MemoryUserStore::new();
        let user = new_user("alice", "alice@example.com");
        let id = user.id.clone();
        store.create(user, "Secret1").await.unwrap();

        store.add_to_role(&id, "Admin").await.unwrap();
        store.add_to_role(&id, "Admin").await.unwrap();
        store.add_claim(&id, "tier", "gold").await.unwrap();

        let user = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(store.get_roles(&user).await.unwrap(), vec!["Admin".to_string()]);
        assert_eq!(store.get_claims(&user).await.unwrap()["tier"], "gold");
        assert!(store.add_to_role("missing", "Admin").await.is_err());
    }
}
