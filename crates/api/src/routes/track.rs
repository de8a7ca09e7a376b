//! Route definitions for the `/tracks` resource.

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::handlers::{track, version};
use crate::state::AppState;

/// Routes mounted at `/tracks`. All require authentication.
///
/// ```text
/// GET    /                                    -> list
/// POST   /                                    -> create (track + first version)
/// GET    /{id}                                -> get_by_id
/// PATCH  /{id}                                -> update
/// DELETE /{id}                                -> delete
/// POST   /{id}/versions                       -> add_version (multipart)
/// PATCH  /{id}/versions/{version_id}          -> update_title
/// DELETE /{id}/versions/{version_id}          -> delete version
/// PUT    /{id}/active-version/{version_id}    -> set_active_version
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(track::list).post(track::create))
        .route(
            "/{id}",
            get(track::get_by_id)
                .patch(track::update)
                .delete(track::delete),
        )
        .route("/{id}/versions", post(version::add_version))
        .route(
            "/{id}/versions/{version_id}",
            patch(version::update_title).delete(version::delete),
        )
        .route(
            "/{id}/active-version/{version_id}",
            put(track::set_active_version),
        )
}
