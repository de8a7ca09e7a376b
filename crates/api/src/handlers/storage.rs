//! Handlers for the `/storage` resource: the multipart upload relay, object
//! serving, combined record+object deletion, and the admin orphan report.

use std::collections::HashSet;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use mixdown_core::audio::DEFAULT_CONTENT_TYPE;
use mixdown_core::error::CoreError;
use mixdown_core::upload::{generate_key, PartDecision, StoredUpload, UploadPolicy, MAX_UPLOAD_BYTES};
use mixdown_db::repositories::{AudioFileRepo, TrackRepo};
use mixdown_storage::{ObjectMeta, ObjectStore};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Multipart relay
// ---------------------------------------------------------------------------

/// Result of relaying one multipart request into the object store.
#[derive(Debug, Default)]
pub struct RelayOutcome {
    /// The stored descriptor of the first accepted file part, if any.
    pub file: Option<StoredUpload>,
    /// Value of an optional `title` text field, if the client sent one.
    pub title: Option<String>,
}

/// Consume a multipart body, writing the first accepted file part to the
/// object store.
///
/// The policy is evaluated per part before any bytes are persisted. Rejected
/// parts are dropped silently, parts without a filename are skipped, and a
/// failed storage write aborts the whole request -- no retry, and no partial
/// result. At most one object is written per request.
pub async fn relay_upload(
    store: &dyn ObjectStore,
    policy: &UploadPolicy,
    multipart: &mut Multipart,
) -> AppResult<RelayOutcome> {
    let mut outcome = RelayOutcome::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "title" {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            outcome.title = Some(text);
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        match policy.evaluate(filename.as_deref(), &content_type, &name) {
            PartDecision::Skip => continue,
            PartDecision::Reject => {
                tracing::debug!(
                    field = %name,
                    content_type = %content_type,
                    "Dropped multipart part with unsupported content type",
                );
                continue;
            }
            PartDecision::Accept => {}
        }

        if outcome.file.is_some() {
            // One in-flight file per request; later file parts are ignored.
            tracing::debug!(field = %name, "Ignoring additional file part");
            continue;
        }

        let filename = filename.unwrap_or_default();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::Core(CoreError::Validation(format!(
                "File too large: {} bytes (max {MAX_UPLOAD_BYTES})",
                bytes.len()
            ))));
        }

        let key = generate_key(&filename);
        let meta = store.put(&key, bytes.to_vec(), &content_type).await?;

        tracing::info!(key = %meta.key, size = meta.size, "Stored uploaded object");

        outcome.file = Some(StoredUpload {
            key: meta.key,
            filename,
            content_type,
            size: meta.size,
        });
    }

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// POST /storage/new
// ---------------------------------------------------------------------------

/// Accept a multipart upload and return `{ key, filename, contentType, size }`
/// for the accepted `file` field.
///
/// Unsupported content types are silently dropped by the filter; a request
/// with no acceptable file part is a 400.
pub async fn upload(
    State(state): State<AppState>,
    auth_user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<StoredUpload>> {
    let policy = UploadPolicy::audio();
    let outcome = relay_upload(state.store.as_ref(), &policy, &mut multipart).await?;

    let upload = outcome.file.ok_or_else(|| {
        AppError::BadRequest("Missing or unsupported 'file' field".into())
    })?;

    tracing::info!(
        user_id = auth_user.user_id,
        key = %upload.key,
        size = upload.size,
        "Upload relayed",
    );
    Ok(Json(upload))
}

// ---------------------------------------------------------------------------
// GET /storage/{*key}
// ---------------------------------------------------------------------------

/// Stream a stored object's bytes with its declared content type.
pub async fn serve(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<impl IntoResponse> {
    let object = state.store.get(&key).await?.ok_or_else(|| {
        AppError::Core(CoreError::NotFoundByKey {
            entity: "AudioFile",
            key: key.clone(),
        })
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, object.content_type.clone())],
        object.bytes,
    ))
}

// ---------------------------------------------------------------------------
// DELETE /storage/{*key}
// ---------------------------------------------------------------------------

/// Delete the track owning the audio file stored under `key`, then its
/// storage objects.
///
/// Returns 404 before any storage deletion when no database record
/// references the key. Record deletion and object deletion are separate,
/// non-atomic calls.
pub async fn remove(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(key): Path<String>,
) -> AppResult<StatusCode> {
    let track = TrackRepo::find_by_file_key(&state.pool, &key)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFoundByKey {
                entity: "Track",
                key: key.clone(),
            })
        })?;

    if track.user_id != auth_user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not own this track".into(),
        )));
    }

    let files = AudioFileRepo::list_by_track(&state.pool, track.id).await?;
    TrackRepo::delete(&state.pool, track.id).await?;

    for file in &files {
        if let Err(e) = state.store.delete(&file.file_key).await {
            tracing::error!(
                track_id = track.id,
                key = %file.file_key,
                error = %e,
                "Failed to delete storage object for deleted track",
            );
        }
    }

    tracing::info!(
        track_id = track.id,
        user_id = auth_user.user_id,
        key = %key,
        "Track deleted via storage key",
    );
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// GET /admin/storage/orphans
// ---------------------------------------------------------------------------

/// List storage objects whose key matches no audio file record.
///
/// The storage write and the database write are two separate calls with no
/// shared transaction, so an aborted flow can leave objects behind. This
/// report makes the gap detectable; reconciliation stays a manual,
/// out-of-band decision.
pub async fn orphans(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ObjectMeta>>>> {
    let referenced: HashSet<String> = AudioFileRepo::list_keys(&state.pool)
        .await?
        .into_iter()
        .collect();

    let orphans: Vec<ObjectMeta> = state
        .store
        .list()
        .await?
        .into_iter()
        .filter(|object| !referenced.contains(&object.key))
        .collect();

    Ok(Json(DataResponse { data: orphans }))
}
