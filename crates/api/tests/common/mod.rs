//! Shared helpers for HTTP-level integration tests.
//!
//! Uses Axum's `tower::ServiceExt` to send requests directly to the router.
//! Prerequisite rows are created via the repository layer to keep tests
//! focused on HTTP behaviour.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use mixdown_api::auth::jwt::JwtConfig;
use mixdown_api::config::ServerConfig;
use mixdown_api::router::build_app_router;
use mixdown_api::state::AppState;
use mixdown_db::repositories::UserRepo;
use mixdown_storage::{FsStore, ObjectStore};

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a fixed JWT secret, and no SMTP mailer.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        public_base_url: "http://localhost:5173".to_string(),
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        smtp: None,
    }
}

/// Create a filesystem object store in a fresh temp directory.
///
/// The returned `TempDir` must be kept alive for the duration of the test.
pub async fn test_store() -> (TempDir, Arc<dyn ObjectStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsStore::new(dir.path()).await.expect("fs store");
    (dir, Arc::new(store))
}

/// Build the full application router with all middleware layers, using the
/// given database pool and object store.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app(pool: PgPool, store: Arc<dyn ObjectStore>) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        store,
        mailer: None,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("request failed")
}

fn with_bearer(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

/// GET `uri`, optionally authenticated.
pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let request = with_bearer(Request::builder().method("GET").uri(uri), token)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// DELETE `uri`, optionally authenticated.
pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let request = with_bearer(Request::builder().method("DELETE").uri(uri), token)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// PUT `uri` with an empty body, optionally authenticated.
pub async fn put(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let request = with_bearer(Request::builder().method("PUT").uri(uri), token)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// POST a JSON body to `uri`, optionally authenticated.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response<Body> {
    let request = with_bearer(Request::builder().method("POST").uri(uri), token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// PATCH a JSON body to `uri`, optionally authenticated.
pub async fn patch_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response<Body> {
    let request = with_bearer(Request::builder().method("PATCH").uri(uri), token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body collect")
        .to_bytes()
        .to_vec()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}

// ---------------------------------------------------------------------------
// Multipart helpers
// ---------------------------------------------------------------------------

/// Boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "mixdown-test-boundary";

/// One part of a multipart body: `(field, filename, content_type, bytes)`.
/// `filename: None` produces a plain text field.
pub type Part<'a> = (&'a str, Option<&'a str>, Option<&'a str>, &'a [u8]);

/// Assemble a `multipart/form-data` body from parts.
pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (field, filename, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{field}\"\r\n").as_bytes(),
            ),
        }
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// POST a multipart body to `uri`, optionally authenticated.
pub async fn post_multipart(
    app: &Router,
    uri: &str,
    parts: &[Part<'_>],
    token: Option<&str>,
) -> Response<Body> {
    let (content_type, body) = multipart_body(parts);
    let request = with_bearer(Request::builder().method("POST").uri(uri), token)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

// ---------------------------------------------------------------------------
// Account helpers
// ---------------------------------------------------------------------------

/// Sign up a user through the API, mark the email verified via the
/// repository layer, log in, and return `(user_id, access_token)`.
pub async fn signup_and_login(app: &Router, pool: &PgPool, username: &str) -> (i64, String) {
    let response = post_json(
        app,
        "/api/v1/auth/signup",
        serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "a-sufficiently-long-password",
        }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "signup should succeed");
    let body = body_json(response).await;
    let user_id = body["data"]["id"].as_i64().expect("user id");

    UserRepo::mark_verified(pool, user_id).await.expect("mark verified");

    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({
            "username": username,
            "password": "a-sufficiently-long-password",
        }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login should succeed");
    let body = body_json(response).await;
    let token = body["access_token"].as_str().expect("access token").to_string();

    (user_id, token)
}

/// Like [`signup_and_login`], but promotes the user to the admin role first.
pub async fn signup_and_login_admin(app: &Router, pool: &PgPool, username: &str) -> (i64, String) {
    let response = post_json(
        app,
        "/api/v1/auth/signup",
        serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "a-sufficiently-long-password",
        }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let user_id = body["data"]["id"].as_i64().expect("user id");

    UserRepo::mark_verified(pool, user_id).await.expect("mark verified");
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("promote admin");

    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({
            "username": username,
            "password": "a-sufficiently-long-password",
        }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let token = body["access_token"].as_str().expect("access token").to_string();

    (user_id, token)
}

/// Upload a small audio file through the relay and return the parsed
/// `{ key, filename, contentType, size }` response.
pub async fn upload_file(
    app: &Router,
    token: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> serde_json::Value {
    let response = post_multipart(
        app,
        "/api/v1/storage/new",
        &[("file", Some(filename), Some(content_type), bytes)],
        Some(token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "upload should succeed");
    body_json(response).await
}

/// Create a track (uploading `bytes` as its first version) and return the
/// track detail JSON.
pub async fn create_track(
    app: &Router,
    token: &str,
    title: &str,
    filename: &str,
    bytes: &[u8],
) -> serde_json::Value {
    let upload = upload_file(app, token, filename, "audio/wav", bytes).await;
    let response = post_json(
        app,
        "/api/v1/tracks",
        serde_json::json!({
            "title": title,
            "file": upload,
        }),
        Some(token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "track create should succeed");
    body_json(response).await
}
