//! Handlers for the `/auth` resource: signup, email verification, login,
//! token refresh, logout, and password reset.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use mixdown_core::error::CoreError;
use mixdown_core::types::DbId;
use mixdown_db::models::account_token::TokenPurpose;
use mixdown_db::models::session::CreateSession;
use mixdown_db::models::user::{CreateUser, User, UserResponse};
use mixdown_db::repositories::{AccountTokenRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::jwt::{generate_access_token, generate_opaque_token, hash_opaque_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::totp;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum consecutive failed login attempts before locking the account.
const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Duration in minutes to lock an account after exceeding failed attempts.
const LOCK_DURATION_MINS: i64 = 15;

/// Email verification token lifetime in hours.
const VERIFY_TOKEN_EXPIRY_HOURS: i64 = 24;

/// Password reset token lifetime in hours.
const RESET_TOKEN_EXPIRY_HOURS: i64 = 1;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/signup`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/verify-email`.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Required when the account has TOTP enabled.
    pub totp_code: Option<String>,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request body for `POST /auth/request-password-reset`.
#[derive(Debug, Deserialize)]
pub struct RequestPasswordResetRequest {
    pub email: String,
}

/// Request body for `POST /auth/reset-password`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Public user info embedded in [`AuthResponse`].
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/signup
///
/// Create an account. The user starts unverified; a verification token is
/// issued and emailed (or logged when no mailer is configured).
pub async fn signup(
    State(state): State<AppState>,
    Json(input): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
    validate_password_strength(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username.clone(),
            email: input.email.clone(),
            password_hash,
        },
    )
    .await?;

    issue_verification_token(&state, &user).await?;

    tracing::info!(user_id = user.id, username = %user.username, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(&user),
        }),
    ))
}

/// POST /api/v1/auth/verify-email
///
/// Consume a verification token and mark the account's email verified.
pub async fn verify_email(
    State(state): State<AppState>,
    Json(input): Json<VerifyEmailRequest>,
) -> AppResult<StatusCode> {
    let token_hash = hash_opaque_token(&input.token);

    let token = AccountTokenRepo::consume(&state.pool, &token_hash, TokenPurpose::VerifyEmail)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "Invalid or expired verification token".into(),
            ))
        })?;

    UserRepo::mark_verified(&state.pool, token.user_id).await?;

    tracing::info!(user_id = token.user_id, "Email verified");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/login
///
/// Authenticate with username + password (+ TOTP code when enabled).
/// Returns access and refresh tokens.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    // 1. Find user by username.
    let user = UserRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid username or password".into(),
            ))
        })?;

    // 2. Check if the account is temporarily locked.
    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }

    // 3. Verify password.
    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        // 4. On failure: increment counter, lock if threshold exceeded.
        UserRepo::increment_failed_login(&state.pool, user.id).await?;

        let new_count = user.failed_login_count + 1;
        if new_count >= MAX_FAILED_ATTEMPTS {
            let lock_until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, lock_until).await?;
            tracing::warn!(user_id = user.id, "Account locked after failed logins");
        }

        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid username or password".into(),
        )));
    }

    // 5. The email address must be verified before first login.
    if !user.is_verified {
        return Err(AppError::Core(CoreError::Forbidden(
            "Email address not verified".into(),
        )));
    }

    // 6. Second factor, when enabled.
    if user.totp_enabled {
        check_totp(&user, input.totp_code.as_deref())?;
    }

    // 7. On success: reset failed count, set last_login_at.
    UserRepo::record_successful_login(&state.pool, user.id).await?;

    // 8. Generate tokens and create session.
    let response = create_auth_response(&state, &user).await?;

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(response))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for new access + refresh tokens.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    // 1. Hash the provided refresh token.
    let token_hash = hash_opaque_token(&input.refresh_token);

    // 2. Find matching active session.
    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    // 3. Revoke old session (token rotation).
    SessionRepo::revoke(&state.pool, session.id).await?;

    // 4. Find the user.
    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    // 5. Generate new tokens and create new session.
    let response = create_auth_response(&state, &user).await?;

    Ok(Json(response))
}

/// POST /api/v1/auth/logout
///
/// Revoke all sessions for the authenticated user. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/request-password-reset
///
/// Issue a reset token when the account exists. Always returns 204 so the
/// endpoint cannot be used to enumerate accounts.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(input): Json<RequestPasswordResetRequest>,
) -> AppResult<StatusCode> {
    let Some(user) = UserRepo::find_by_email(&state.pool, &input.email).await? else {
        tracing::debug!(email = %input.email, "Password reset requested for unknown email");
        return Ok(StatusCode::NO_CONTENT);
    };

    // A newly issued token is the only valid one.
    AccountTokenRepo::invalidate_for_user(&state.pool, user.id, TokenPurpose::ResetPassword)
        .await?;

    let (plaintext, hash) = generate_opaque_token();
    let expires_at = Utc::now() + chrono::Duration::hours(RESET_TOKEN_EXPIRY_HOURS);
    AccountTokenRepo::create(&state.pool, user.id, &hash, TokenPurpose::ResetPassword, expires_at)
        .await?;

    let reset_url = format!(
        "{}/reset-password?token={plaintext}",
        state.config.public_base_url
    );
    if let Some(mailer) = &state.mailer {
        if let Err(e) = mailer
            .send_password_reset(&user.email, &user.username, &reset_url)
            .await
        {
            tracing::error!(user_id = user.id, error = %e, "Failed to send reset email");
        }
    } else {
        tracing::info!(user_id = user.id, "Password reset token issued (no mailer configured)");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/reset-password
///
/// Consume a reset token, set the new password, and revoke all sessions.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password_strength(&input.new_password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let token_hash = hash_opaque_token(&input.token);
    let token = AccountTokenRepo::consume(&state.pool, &token_hash, TokenPurpose::ResetPassword)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Validation(
                "Invalid or expired reset token".into(),
            ))
        })?;

    let password_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::set_password_hash(&state.pool, token.user_id, &password_hash).await?;

    // Every existing session is invalidated along with the old password.
    SessionRepo::revoke_all_for_user(&state.pool, token.user_id).await?;

    tracing::info!(user_id = token.user_id, "Password reset completed");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Issue a fresh verification token and send (or log) the verification mail.
async fn issue_verification_token(state: &AppState, user: &User) -> AppResult<()> {
    let (plaintext, hash) = generate_opaque_token();
    let expires_at = Utc::now() + chrono::Duration::hours(VERIFY_TOKEN_EXPIRY_HOURS);
    AccountTokenRepo::create(&state.pool, user.id, &hash, TokenPurpose::VerifyEmail, expires_at)
        .await?;

    let verify_url = format!(
        "{}/verify-email?token={plaintext}",
        state.config.public_base_url
    );
    if let Some(mailer) = &state.mailer {
        if let Err(e) = mailer
            .send_verification(&user.email, &user.username, &verify_url)
            .await
        {
            tracing::error!(user_id = user.id, error = %e, "Failed to send verification email");
        }
    } else {
        tracing::info!(user_id = user.id, "Verification token issued (no mailer configured)");
    }
    Ok(())
}

/// Check the submitted TOTP code against the user's enrolled secret.
fn check_totp(user: &User, submitted: Option<&str>) -> AppResult<()> {
    let secret = user.totp_secret.as_deref().ok_or_else(|| {
        AppError::InternalError("TOTP enabled without a stored secret".into())
    })?;
    let code = submitted.ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized("TOTP code required".into()))
    })?;

    let valid = totp::verify_code(secret, code, Utc::now().timestamp())
        .map_err(|e| AppError::InternalError(format!("TOTP verification error: {e}")))?;
    if !valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid TOTP code".into(),
        )));
    }
    Ok(())
}

/// Generate access + refresh tokens, persist a session row, and build the response.
async fn create_auth_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let access_token = generate_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_opaque_token();

    let expires_at =
        Utc::now() + chrono::Duration::days(state.config.jwt.refresh_token_expiry_days);

    let session_input = CreateSession {
        user_id: user.id,
        refresh_token_hash: refresh_hash,
        expires_at,
        user_agent: None,
        ip_address: None,
    };
    SessionRepo::create(&state.pool, &session_input).await?;

    let expires_in = state.config.jwt.access_token_expiry_mins * 60;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in,
        user: UserInfo {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        },
    })
}
