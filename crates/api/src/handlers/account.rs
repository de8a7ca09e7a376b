//! Handlers for the `/account` resource: profile and TOTP enrollment.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use mixdown_core::error::CoreError;
use mixdown_db::models::user::{User, UserResponse};
use mixdown_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};

use crate::auth::totp;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Response body for `POST /account/totp/setup`.
#[derive(Debug, Serialize)]
pub struct TotpSetupResponse {
    /// Base32 secret for manual entry.
    pub secret: String,
    /// `otpauth://` URI for QR enrollment.
    pub otpauth_uri: String,
}

/// Request body for TOTP enable/disable.
#[derive(Debug, Deserialize)]
pub struct TotpCodeRequest {
    pub code: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/account
///
/// The authenticated user's profile.
pub async fn profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = load_user(&state, &auth_user).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// POST /api/v1/account/totp/setup
///
/// Generate and store a fresh TOTP secret (not yet enforced) and return the
/// provisioning URI. Calling again replaces any previous un-enabled secret.
pub async fn totp_setup(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<TotpSetupResponse>>> {
    let user = load_user(&state, &auth_user).await?;

    if user.totp_enabled {
        return Err(AppError::Core(CoreError::Conflict(
            "TOTP is already enabled. Disable it before re-enrolling.".into(),
        )));
    }

    let secret = totp::generate_secret();
    UserRepo::set_totp_secret(&state.pool, user.id, &secret).await?;

    let otpauth_uri = totp::provisioning_uri(&secret, &user.username);

    tracing::info!(user_id = user.id, "TOTP secret generated");
    Ok(Json(DataResponse {
        data: TotpSetupResponse {
            secret,
            otpauth_uri,
        },
    }))
}

/// POST /api/v1/account/totp/enable
///
/// Verify one code against the stored secret and turn enforcement on.
pub async fn totp_enable(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<TotpCodeRequest>,
) -> AppResult<StatusCode> {
    let user = load_user(&state, &auth_user).await?;

    let secret = user.totp_secret.as_deref().ok_or_else(|| {
        AppError::Core(CoreError::Validation(
            "No TOTP secret enrolled. Call setup first.".into(),
        ))
    })?;

    verify_submitted_code(secret, &input.code)?;

    UserRepo::enable_totp(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, "TOTP enabled");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/account/totp/disable
///
/// Verify one code and turn enforcement off, clearing the secret.
pub async fn totp_disable(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<TotpCodeRequest>,
) -> AppResult<StatusCode> {
    let user = load_user(&state, &auth_user).await?;

    if !user.totp_enabled {
        return Err(AppError::Core(CoreError::Validation(
            "TOTP is not enabled".into(),
        )));
    }
    let secret = user.totp_secret.as_deref().ok_or_else(|| {
        AppError::InternalError("TOTP enabled without a stored secret".into())
    })?;

    verify_submitted_code(secret, &input.code)?;

    UserRepo::disable_totp(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, "TOTP disabled");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch the authenticated user's full row.
async fn load_user(state: &AppState, auth_user: &AuthUser) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth_user.user_id,
        }))
}

/// Validate a submitted TOTP code against a secret.
fn verify_submitted_code(secret: &str, code: &str) -> AppResult<()> {
    let valid = totp::verify_code(secret, code, Utc::now().timestamp())
        .map_err(|e| AppError::InternalError(format!("TOTP verification error: {e}")))?;
    if !valid {
        return Err(AppError::Core(CoreError::Validation(
            "Invalid TOTP code".into(),
        )));
    }
    Ok(())
}
