pub mod account;
pub mod admin;
pub mod auth;
pub mod health;
pub mod storage;
pub mod track;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/signup                                 signup (public)
/// /auth/verify-email                           verify email (public)
/// /auth/login                                  login (public)
/// /auth/refresh                                refresh (public)
/// /auth/logout                                 logout (requires auth)
/// /auth/request-password-reset                 request reset (public)
/// /auth/reset-password                         reset password (public)
///
/// /account                                     profile (requires auth)
/// /account/totp/setup                          TOTP enrollment
/// /account/totp/enable                         TOTP enable
/// /account/totp/disable                        TOTP disable
///
/// /tracks                                      list, create
/// /tracks/{id}                                 get, update, delete
/// /tracks/{id}/versions                        add version (multipart)
/// /tracks/{id}/versions/{version_id}           edit title, delete
/// /tracks/{id}/active-version/{version_id}     set active (PUT)
///
/// /storage/new                                 upload relay (multipart)
/// /storage/{*key}                              serve (GET), delete (DELETE)
///
/// /admin/storage/orphans                       orphaned object report (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/account", account::router())
        .nest("/tracks", track::router())
        .nest("/storage", storage::router())
        .nest("/admin", admin::router())
}
