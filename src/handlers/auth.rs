//! HTTP routes for registration, login and profile management

use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::multipart::{FormData, Part};
use warp::reply::Response;
use warp::{Buf, Filter, Rejection, Reply};

use crate::auth::token::{extract_bearer_token, AuthenticatedUser, TokenManager};
use crate::constants::{MAX_JSON_BODY_BYTES, MAX_TOKEN_LENGTH};
use crate::core::gateway::{CredentialGateway, EditProfileRequest, PhotoUpload, RegisterRequest};
use crate::error::{AuthGatewayError, Result};
use crate::security::with_api_security_headers;
use crate::security_logger::{SecurityEvent, SecurityLogger};

/// Login body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ProfilePictureResponse {
    pub profile_picture: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Rejection raised when a protected route is called without a valid token
#[derive(Debug)]
pub struct Unauthenticated {
    pub reason: String,
}

impl warp::reject::Reject for Unauthenticated {}

/// Everything the routes need, shared across requests
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<CredentialGateway>,
    pub tokens: Arc<TokenManager>,
    pub security_logger: Arc<SecurityLogger>,
    pub max_upload_bytes: u64,
    /// Directory served under `/blobs`, the local object store root
    pub blob_root: PathBuf,
}

/// Build the full route tree, including rejection recovery and security headers
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let max_upload = state.max_upload_bytes;

    let register = warp::path!("auth" / "register")
        .and(warp::post())
        .and(warp::body::content_length_limit(max_upload))
        .and(warp::multipart::form().max_length(max_upload))
        .and(with_gateway(state.gateway.clone()))
        .and_then(handle_register);

    let login = warp::path!("auth" / "login")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_JSON_BODY_BYTES))
        .and(warp::body::json())
        .and(with_gateway(state.gateway.clone()))
        .and_then(handle_login);

    let edit_profile = warp::path!("auth" / "edit-profile")
        .and(warp::put())
        .and(with_auth(state.tokens.clone(), state.security_logger.clone()))
        .and(warp::body::content_length_limit(max_upload))
        .and(warp::multipart::form().max_length(max_upload))
        .and(with_gateway(state.gateway.clone()))
        .and_then(handle_edit_profile);

    let profile_picture = warp::path!("auth" / "getProfilePicture")
        .and(warp::get())
        .and(with_auth(state.tokens.clone(), state.security_logger.clone()))
        .and(with_gateway(state.gateway.clone()))
        .and_then(handle_get_profile_picture);

    let health = warp::path!("health").and(warp::get()).map(|| "OK");

    // Uploaded photos, addressed as /blobs/<container>/<name>
    let blobs = warp::path("blobs")
        .and(warp::get())
        .and(warp::fs::dir(state.blob_root.clone()));

    register
        .or(login)
        .or(edit_profile)
        .or(profile_picture)
        .or(health)
        .or(blobs)
        .recover(handle_rejection)
        .map(|reply| with_api_security_headers(reply))
}

// Helper function to include the gateway in request
fn with_gateway(
    gateway: Arc<CredentialGateway>,
) -> impl Filter<Extract = (Arc<CredentialGateway>,), Error = Infallible> + Clone {
    warp::any().map(move || gateway.clone())
}

/// Filter that only passes requests carrying a valid bearer token
pub fn with_auth(
    tokens: Arc<TokenManager>,
    security_logger: Arc<SecurityLogger>,
) -> impl Filter<Extract = (AuthenticatedUser,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let tokens = tokens.clone();
        let security_logger = security_logger.clone();
        async move {
            match authenticate_request(header.as_deref(), &tokens) {
                Ok(user) => Ok(user),
                Err(e) => {
                    security_logger
                        .log_event(SecurityEvent::TokenValidationFailed {
                            reason: e.to_string(),
                        })
                        .await;
                    Err(warp::reject::custom(Unauthenticated {
                        reason: e.to_string(),
                    }))
                }
            }
        }
    })
}

/// Verify the Authorization header and recover the caller identity
pub fn authenticate_request(
    auth_header: Option<&str>,
    tokens: &TokenManager,
) -> Result<AuthenticatedUser> {
    let header = auth_header.ok_or_else(|| {
        AuthGatewayError::AuthError("Missing Authorization header".to_string())
    })?;
    let token = extract_bearer_token(header).ok_or_else(|| {
        AuthGatewayError::AuthError("Authorization header is not a bearer token".to_string())
    })?;

    if token.len() > MAX_TOKEN_LENGTH {
        return Err(AuthGatewayError::AuthError("Token too long".to_string()));
    }
    if token.chars().any(|c| c.is_control()) {
        return Err(AuthGatewayError::AuthError(
            "Token contains invalid characters".to_string(),
        ));
    }

    let claims = tokens.get_claims(&token)?;
    if claims.user_id.is_empty() || claims.name.is_empty() {
        return Err(AuthGatewayError::AuthError("Invalid token claims".to_string()));
    }

    Ok(AuthenticatedUser::from(claims))
}

async fn handle_register(
    form: FormData,
    gateway: Arc<CredentialGateway>,
) -> std::result::Result<Response, Infallible> {
    let result: Result<()> = async {
        let mut fields = read_form(form).await?;
        let request = RegisterRequest {
            username: fields.take_text("username").unwrap_or_default(),
            email: fields.take_text("email").unwrap_or_default(),
            password: fields.take_text("password").unwrap_or_default(),
            photo: fields.take_photo(),
        };
        gateway.register(request).await
    }
    .await;

    Ok(match result {
        Ok(()) => message_reply("Registration successful."),
        Err(e) => error_reply(e),
    })
}

async fn handle_login(
    body: LoginRequest,
    gateway: Arc<CredentialGateway>,
) -> std::result::Result<Response, Infallible> {
    Ok(match gateway.login(&body.username, &body.password).await {
        Ok(pair) => warp::reply::json(&pair).into_response(),
        Err(e) => error_reply(e),
    })
}

async fn handle_edit_profile(
    identity: AuthenticatedUser,
    form: FormData,
    gateway: Arc<CredentialGateway>,
) -> std::result::Result<Response, Infallible> {
    let result: Result<()> = async {
        let mut fields = read_form(form).await?;
        let request = EditProfileRequest {
            username: fields.take_text("username"),
            email: fields.take_text("email"),
            photo: fields.take_photo(),
        };
        gateway.edit_profile(&identity, request).await
    }
    .await;

    Ok(match result {
        Ok(()) => message_reply("Profile updated successfully."),
        Err(e) => error_reply(e),
    })
}

async fn handle_get_profile_picture(
    identity: AuthenticatedUser,
    gateway: Arc<CredentialGateway>,
) -> std::result::Result<Response, Infallible> {
    Ok(match gateway.get_profile_photo(&identity).await {
        Ok(url) => warp::reply::json(&ProfilePictureResponse {
            profile_picture: url,
        })
        .into_response(),
        Err(e) => error_reply(e),
    })
}

/// Parsed multipart form
#[derive(Debug, Default)]
struct FormFields {
    texts: Vec<(String, String)>,
    photo: Option<PhotoUpload>,
}

impl FormFields {
    fn take_text(&mut self, name: &str) -> Option<String> {
        let index = self.texts.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.texts.remove(index).1)
    }

    fn take_photo(&mut self) -> Option<PhotoUpload> {
        self.photo.take()
    }
}

/// Field names a photo may arrive under
const PHOTO_FIELDS: &[&str] = &["photo", "profilephoto", "newprofilephoto"];

async fn read_form(form: FormData) -> Result<FormFields> {
    let mut fields = FormFields::default();
    let mut parts = Box::pin(form);

    while let Some(part) = parts
        .try_next()
        .await
        .map_err(|e| AuthGatewayError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = part.name().to_string();
        let file_name = part.filename().map(str::to_string);
        let content_type = part.content_type().map(str::to_string);
        let data = read_part(part).await?;

        if PHOTO_FIELDS.contains(&name.to_ascii_lowercase().as_str()) {
            // An empty file input counts as no photo
            if !data.is_empty() {
                fields.photo = Some(PhotoUpload {
                    file_name,
                    content_type,
                    data,
                });
            }
            continue;
        }

        let text = String::from_utf8(data).map_err(|_| {
            AuthGatewayError::BadRequest(format!("Field '{}' is not valid UTF-8", name))
        })?;
        fields.texts.push((name, text));
    }

    Ok(fields)
}

async fn read_part(part: Part) -> Result<Vec<u8>> {
    part.stream()
        .try_fold(Vec::new(), |mut data, buf| async move {
            data.extend_from_slice(buf.chunk());
            Ok(data)
        })
        .await
        .map_err(|e| AuthGatewayError::BadRequest(format!("Failed to read form field: {}", e)))
}

fn message_reply(message: &str) -> Response {
    warp::reply::json(&MessageResponse {
        message: message.to_string(),
    })
    .into_response()
}

fn error_body(status: StatusCode, code: &str, message: &str) -> Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
        }),
        status,
    )
    .into_response()
}

/// Map a gateway error onto its HTTP response
pub fn error_reply(err: AuthGatewayError) -> Response {
    match err {
        AuthGatewayError::Validation(errors) => {
            warp::reply::with_status(warp::reply::json(&errors), StatusCode::BAD_REQUEST)
                .into_response()
        }
        AuthGatewayError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, "bad_request", &msg),
        AuthGatewayError::Unauthorized(msg) => {
            error_body(StatusCode::UNAUTHORIZED, "unauthorized", &msg)
        }
        AuthGatewayError::AuthError(_) => error_body(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Invalid or expired token.",
        ),
        other => {
            log::error!("Request failed: {}", other);
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "The request could not be completed.",
            )
        }
    }
}

/// Turn filter rejections into JSON error responses
pub async fn handle_rejection(err: Rejection) -> std::result::Result<Response, Infallible> {
    if let Some(unauthenticated) = err.find::<Unauthenticated>() {
        log::debug!("Rejected unauthenticated request: {}", unauthenticated.reason);
        return Ok(error_body(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "A valid bearer token is required.",
        ));
    }

    if err.is_not_found() {
        return Ok(error_body(StatusCode::NOT_FOUND, "not_found", "Not found."));
    }

    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(error_body(StatusCode::BAD_REQUEST, "bad_request", &e.to_string()));
    }

    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(error_body(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "Request body is too large.",
        ));
    }

    if err.find::<warp::reject::LengthRequired>().is_some() {
        return Ok(error_body(
            StatusCode::LENGTH_REQUIRED,
            "length_required",
            "A Content-Length header is required.",
        ));
    }

    if err.find::<warp::reject::UnsupportedMediaType>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
        || err.find::<warp::reject::MissingHeader>().is_some()
    {
        return Ok(error_body(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "Unsupported or malformed request body.",
        ));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(error_body(
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "Method not allowed.",
        ));
    }

    log::error!("Unhandled rejection: {:?}", err);
    Ok(error_body(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "The request could not be completed.",
    ))
}
