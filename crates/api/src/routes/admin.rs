//! Route definitions for admin endpoints.

use axum::routing::get;
use axum::Router;

use crate::handlers::storage;
use crate::state::AppState;

/// Routes mounted at `/admin`. All require the admin role.
///
/// ```text
/// GET /storage/orphans  -> orphaned storage object report
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/storage/orphans", get(storage::orphans))
}
