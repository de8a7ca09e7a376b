//! Route definitions for the `/storage` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::storage;
use crate::state::AppState;

/// Routes mounted at `/storage`.
///
/// ```text
/// POST   /new     -> upload relay (multipart, requires auth)
/// GET    /{*key}  -> serve object bytes (public; playback URLs)
/// DELETE /{*key}  -> delete owning track + objects (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/new", post(storage::upload))
        .route("/{*key}", get(storage::serve).delete(storage::remove))
}
