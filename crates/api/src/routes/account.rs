//! Route definitions for the `/account` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::account;
use crate::state::AppState;

/// Routes mounted at `/account`. All require authentication.
///
/// ```text
/// GET  /              -> profile
/// POST /totp/setup    -> totp_setup
/// POST /totp/enable   -> totp_enable
/// POST /totp/disable  -> totp_disable
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(account::profile))
        .route("/totp/setup", post(account::totp_setup))
        .route("/totp/enable", post(account::totp_enable))
        .route("/totp/disable", post(account::totp_disable))
}
