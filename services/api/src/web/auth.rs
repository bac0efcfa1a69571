//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: signup, login, logout, the current user and the
//! password-reset flow.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use campus_core::domain::{normalize_email, AuthSession, PasswordResetToken};
use campus_core::notify::{self, Template};
use campus_core::{Actor, PortError, Role, User};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::extract::ApiJson;
use crate::web::middleware::{SessionToken, SESSION_COOKIE};
use crate::web::response::ApiResponse;
use crate::web::state::AppState;

pub const MIN_PASSWORD_LENGTH: usize = 8;
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `student` (default) or `recruiter`.
    pub role: Option<Role>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    /// Opaque session token, also set as the `session` cookie.
    pub token: String,
    pub user: User,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, hashed: &str) -> ApiResult<bool> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PortError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ))
        .into());
    }
    Ok(())
}

fn session_cookie(state: &AppState, token: &str, max_age_secs: i64) -> String {
    let secure = if state.config.is_development() { "" } else { " Secure;" };
    format!(
        "{}={}; HttpOnly;{} SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, secure, max_age_secs
    )
}

/// Creates a session for the user and builds the response carrying it.
async fn start_session(state: &AppState, user: User, message: &str, created: bool) -> ApiResult<Response> {
    let token = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);
    state
        .services
        .db
        .create_auth_session(&AuthSession {
            id: token.clone(),
            user_id: user.id,
            expires_at: Utc::now() + ttl,
        })
        .await?;

    let cookie = session_cookie(state, &token, ttl.num_seconds());
    let body = AuthResponse { token, user };
    let response = if created {
        ApiResponse::created(message, body)
    } else {
        ApiResponse::ok(message, body)
    };
    Ok(([(header::SET_COOKIE, cookie)], response).into_response())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<Response> {
    let name = req.name.trim();
    let email = normalize_email(&req.email);
    if name.is_empty() {
        return Err(PortError::Validation("name is required".to_string()).into());
    }
    if !email.contains('@') {
        return Err(PortError::Validation("a valid email is required".to_string()).into());
    }
    validate_password(&req.password)?;
    let role = match req.role.unwrap_or_default() {
        role @ (Role::Student | Role::Recruiter) => role,
        _ => {
            return Err(ApiError::BadRequest(
                "only student or recruiter accounts can be created at signup".to_string(),
            ))
        }
    };

    let password_hash = hash_password(&req.password)?;
    let user = User::new(name, &email, role, Utc::now());
    state.services.db.create_user(&user, &password_hash).await?;
    info!(user_id = %user.id, role = role.as_str(), "user registered");

    notify::dispatch(&state.services.notifier, Template::Welcome { user: &user }.render());
    start_session(&state, user, "Account created", true).await
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials or deactivated account")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Response> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user_creds = match state.services.db.get_user_by_email(&normalize_email(&req.email)).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };
    if !verify_password(&req.password, &user_creds.hashed_password)? {
        return Err(invalid());
    }
    if !user_creds.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated".to_string()));
    }

    let now = Utc::now();
    if let Err(e) = state.services.db.record_login(user_creds.user_id, now).await {
        warn!(user_id = %user_creds.user_id, error = %e, "failed to record login time");
    }
    let user = state.services.db.get_user(user_creds.user_id).await?;
    start_session(&state, user, "Login successful", false).await
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> ApiResult<Response> {
    state.services.db.delete_auth_session(&token).await?;
    let cookie = session_cookie(&state, "", 0);
    Ok((
        [(header::SET_COOKIE, cookie)],
        ApiResponse::ok("Logged out", ()),
    )
        .into_response())
}

/// GET /auth/me - The authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses((status = 200, description = "Current user", body = User))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<ApiResponse<User>> {
    let user = state.services.db.get_user(actor.id).await?;
    Ok(ApiResponse::ok("Current user", user))
}

/// POST /auth/forgot-password - Email a reset link
///
/// Always answers with success for unknown emails so accounts cannot be
/// enumerated.
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent if the account exists"),
        (status = 500, description = "The email could not be sent")
    )
)]
pub async fn forgot_password_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<ApiResponse<()>> {
    const DONE: &str = "If that account exists, a reset link has been sent";

    let creds = match state.services.db.get_user_by_email(&normalize_email(&req.email)).await {
        Ok(creds) if creds.is_active => creds,
        Ok(_) | Err(PortError::NotFound(_)) => return Ok(ApiResponse::ok(DONE, ())),
        Err(e) => return Err(e.into()),
    };
    let user = state.services.db.get_user(creds.user_id).await?;

    let reset = PasswordResetToken {
        token: Uuid::new_v4().simple().to_string(),
        user_id: user.id,
        expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
    };
    state.services.db.create_reset_token(&reset).await?;

    let link = format!("{}/reset-password?token={}", state.config.frontend_url, reset.token);
    let email = Template::PasswordReset { user: &user, link: &link }.render();
    if let Err(e) = state.services.notifier.send(email).await {
        error!(user_id = %user.id, error = %e, "failed to send password reset email");
        if let Err(e) = state.services.db.delete_reset_token(&reset.token).await {
            warn!(user_id = %user.id, error = %e, "failed to discard unsent reset token");
        }
        return Err(ApiError::Internal("Failed to send the password reset email".to_string()));
    }

    info!(user_id = %user.id, "password reset requested");
    Ok(ApiResponse::ok(DONE, ()))
}

/// POST /auth/reset-password - Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Token invalid or expired")
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<ApiResponse<()>> {
    validate_password(&req.new_password)?;
    let reset = state.services.db.find_reset_token(req.token.trim()).await?;

    let password_hash = hash_password(&req.new_password)?;
    state
        .services
        .db
        .set_password(reset.user_id, &password_hash)
        .await?;
    state.services.db.delete_reset_token(&reset.token).await?;
    state
        .services
        .db
        .delete_sessions_for_user(reset.user_id)
        .await?;

    info!(user_id = %reset.user_id, "password reset completed");
    Ok(ApiResponse::ok("Password has been reset", ()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
