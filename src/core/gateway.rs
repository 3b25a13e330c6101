//! Credential gateway: registration, login and profile management
//!
//! The gateway holds no state of its own. Every collaborator is handed in
//! through [`CredentialGateway::new`], and each operation is one short
//! request against the user store, the object store and the token issuer.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::token::{generate_refresh_token, AuthenticatedUser, TokenManager, TokenPair};
use crate::auth::user::{IdentityError, User};
use crate::error::{AuthGatewayError, Result};
use crate::security::AuthTimer;
use crate::security_logger::{SecurityEvent, SecurityLogger};
use crate::storage::blob::unique_blob_name;
use crate::storage::traits::{ObjectStore, SignInResult, UserStore};

/// An uploaded photo file
#[derive(Debug, Clone, Default)]
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Registration form
#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub photo: Option<PhotoUpload>,
}

/// Profile edit form, absent or blank fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct EditProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub photo: Option<PhotoUpload>,
}

/// Gateway behaviour that does not belong to a collaborator
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub default_photo_url: String,
    pub min_auth_duration: Duration,
}

pub struct CredentialGateway {
    users: Arc<dyn UserStore>,
    objects: Arc<dyn ObjectStore>,
    tokens: Arc<TokenManager>,
    security_logger: Arc<SecurityLogger>,
    settings: GatewaySettings,
}

/// Non-blank trimmed value of an optional form field
fn provided(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CredentialGateway {
    pub fn new(
        users: Arc<dyn UserStore>,
        objects: Arc<dyn ObjectStore>,
        tokens: Arc<TokenManager>,
        security_logger: Arc<SecurityLogger>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            users,
            objects,
            tokens,
            security_logger,
            settings,
        }
    }

    /// Create a user, uploading the photo first when one is supplied
    pub async fn register(&self, request: RegisterRequest) -> Result<()> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_string();

        let mut missing = Vec::new();
        if username.is_empty() {
            missing.push(IdentityError::required_field("Username"));
        }
        if email.is_empty() {
            missing.push(IdentityError::required_field("Email"));
        }
        if request.password.is_empty() {
            missing.push(IdentityError::required_field("Password"));
        }
        if !missing.is_empty() {
            self.security_logger
                .log_event(SecurityEvent::RegistrationRejected {
                    username,
                    error_count: missing.len(),
                })
                .await;
            return Err(AuthGatewayError::Validation(missing));
        }

        let (profile_photo_url, uploaded) = match request.photo {
            Some(photo) => (self.upload_photo(photo).await?, true),
            None => (self.settings.default_photo_url.clone(), false),
        };

        let user = User::new(username.clone(), email, profile_photo_url.clone());
        let user_id = user.id.clone();

        match self.users.create(user, &request.password).await {
            Ok(()) => {
                self.security_logger
                    .log_event(SecurityEvent::UserRegistered { user_id })
                    .await;
                Ok(())
            }
            Err(AuthGatewayError::Validation(errors)) => {
                if uploaded {
                    log::warn!("Registration rejected, orphaned photo {}", profile_photo_url);
                }
                self.security_logger
                    .log_event(SecurityEvent::RegistrationRejected {
                        username,
                        error_count: errors.len(),
                    })
                    .await;
                Err(AuthGatewayError::Validation(errors))
            }
            Err(e) => {
                if uploaded {
                    log::warn!("Registration failed, orphaned photo {}", profile_photo_url);
                }
                Err(e)
            }
        }
    }

    /// Verify credentials and issue a token pair
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let timer = AuthTimer::new(self.settings.min_auth_duration);

        let mut missing = Vec::new();
        if username.trim().is_empty() {
            missing.push(IdentityError::required_field("Username"));
        }
        if password.is_empty() {
            missing.push(IdentityError::required_field("Password"));
        }
        if !missing.is_empty() {
            timer.wait().await;
            return Err(AuthGatewayError::Validation(missing));
        }

        let user = match self.users.find_by_username(username.trim()).await? {
            Some(user) => user,
            None => {
                self.security_logger
                    .log_event(SecurityEvent::AuthenticationFailed {
                        username: username.to_string(),
                        reason: "unknown user".to_string(),
                    })
                    .await;
                timer.wait().await;
                return Err(AuthGatewayError::Unauthorized(
                    "Invalid username or password.".to_string(),
                ));
            }
        };

        let reason = match self.users.check_password(&user, password).await {
            Ok(SignInResult::Success) => None,
            Ok(SignInResult::Failed) => Some("password mismatch".to_string()),
            Ok(SignInResult::LockedOut) => Some("account locked out".to_string()),
            Err(e) => Some(format!("password check error: {}", e)),
        };
        if let Some(reason) = reason {
            self.security_logger
                .log_event(SecurityEvent::AuthenticationFailed {
                    username: user.username.clone(),
                    reason,
                })
                .await;
            timer.wait().await;
            return Err(AuthGatewayError::BadRequest("Login failed.".to_string()));
        }

        let user_id = user.id.clone();
        let pair = self.generate_token(user).await?;
        self.security_logger
            .log_event(SecurityEvent::AuthenticationSuccess { user_id })
            .await;
        Ok(pair)
    }

    /// Apply the provided profile fields to the caller's identity
    pub async fn edit_profile(
        &self,
        identity: &AuthenticatedUser,
        request: EditProfileRequest,
    ) -> Result<()> {
        let mut user = self.resolve(identity, "edit-profile").await?;

        if let Some(username) = provided(&request.username) {
            user.username = username.to_string();
        }
        if let Some(email) = provided(&request.email) {
            user.email = email.to_string();
        }
        let mut uploaded = None;
        if let Some(photo) = request.photo {
            let url = self.upload_photo(photo).await?;
            user.profile_photo_url = url.clone();
            uploaded = Some(url);
        }

        if let Err(e) = self.users.update(&user).await {
            if let Some(url) = uploaded {
                log::warn!("Profile update rejected, orphaned photo {}", url);
            }
            return Err(e);
        }
        self.security_logger
            .log_event(SecurityEvent::ProfileUpdated { user_id: user.id })
            .await;
        Ok(())
    }

    /// Stored photo URL of the caller
    pub async fn get_profile_photo(&self, identity: &AuthenticatedUser) -> Result<String> {
        let user = self.resolve(identity, "getProfilePicture").await?;
        Ok(user.profile_photo_url)
    }

    /// Load the user a verified token refers to
    async fn resolve(&self, identity: &AuthenticatedUser, resource: &str) -> Result<User> {
        match self.users.find_by_id(&identity.user_id).await? {
            Some(user) => Ok(user),
            None => {
                self.security_logger
                    .log_event(SecurityEvent::UnauthorizedAccess {
                        user_id: Some(identity.user_id.clone()),
                        resource: resource.to_string(),
                    })
                    .await;
                Err(AuthGatewayError::Unauthorized("User not found.".to_string()))
            }
        }
    }

    /// Sign an access token and replace the stored refresh token
    async fn generate_token(&self, user: User) -> Result<TokenPair> {
        let roles = self.users.get_roles(&user).await?;
        let claims = self.users.get_claims(&user).await?;

        let access_token = self
            .tokens
            .issue_token(&user.id, &user.email, &roles, &claims)?;
        let refresh_token = generate_refresh_token();

        self.users.set_refresh_token(&user, &refresh_token).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn upload_photo(&self, photo: PhotoUpload) -> Result<String> {
        let name = unique_blob_name(photo.file_name.as_deref());
        log::debug!(
            "Uploading profile photo {} ({} bytes, {:?})",
            name,
            photo.data.len(),
            photo.content_type
        );
        self.objects.upload(photo.data, &name).await
    }
}
