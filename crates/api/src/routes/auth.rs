//! Route definitions for the `/auth` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /signup                  -> signup
/// POST /verify-email            -> verify_email
/// POST /login                   -> login
/// POST /refresh                 -> refresh
/// POST /logout                  -> logout (requires auth)
/// POST /request-password-reset  -> request_password_reset
/// POST /reset-password          -> reset_password
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/verify-email", post(auth::verify_email))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/request-password-reset", post(auth::request_password_reset))
        .route("/reset-password", post(auth::reset_password))
}
