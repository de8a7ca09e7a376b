//! Handlers for the `/tracks/{id}/versions` resource.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use mixdown_core::error::CoreError;
use mixdown_core::types::DbId;
use mixdown_core::upload::UploadPolicy;
use mixdown_db::models::audio_file::StoredFileInput;
use mixdown_db::models::track::Track;
use mixdown_db::models::version::{CreateVersion, TrackVersion};
use mixdown_db::repositories::{AudioFileRepo, VersionRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::storage::relay_upload;
use crate::handlers::track::{ensure_track_owned, playback_url_for_key, VersionView};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PATCH /tracks/{id}/versions/{version_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateVersionRequest {
    pub title: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/tracks/{id}/versions
///
/// The per-track upload endpoint: accepts a multipart form with a required
/// `file` field and an optional `title` field, relays the file to storage,
/// and appends a new version + audio file record to the track.
pub async fn add_version(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(track_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<VersionView>>)> {
    ensure_track_owned(&state.pool, track_id, &auth_user).await?;

    let policy = UploadPolicy::audio();
    let outcome = relay_upload(state.store.as_ref(), &policy, &mut multipart).await?;

    let file = outcome.file.ok_or_else(|| {
        AppError::BadRequest("Missing or unsupported 'file' field".into())
    })?;

    let title = outcome
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| file.filename.clone());

    let (version, audio) = VersionRepo::create_with_file(
        &state.pool,
        &CreateVersion { track_id, title },
        &StoredFileInput {
            key: file.key.clone(),
            filename: file.filename.clone(),
            content_type: file.content_type.clone(),
            size: file.size,
        },
    )
    .await?;

    tracing::info!(
        track_id,
        version_id = version.id,
        version_number = version.version_number,
        key = %audio.file_key,
        "Version added",
    );

    let view = VersionView {
        id: version.id,
        version_number: version.version_number,
        title: version.title,
        created_at: version.created_at,
        filename: Some(audio.filename),
        content_type: Some(audio.content_type),
        size_bytes: Some(audio.size_bytes),
        playback_url: Some(playback_url_for_key(&audio.file_key)),
    };

    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

/// PATCH /api/v1/tracks/{id}/versions/{version_id}
///
/// Edit a version's title -- the only mutable field after creation.
pub async fn update_title(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((track_id, version_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateVersionRequest>,
) -> AppResult<Json<DataResponse<TrackVersion>>> {
    if input.title.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Version title must not be empty".into(),
        )));
    }

    ensure_version_in_owned_track(&state, track_id, version_id, &auth_user).await?;

    let version = VersionRepo::update_title(&state.pool, version_id, input.title.trim())
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TrackVersion",
            id: version_id,
        }))?;

    Ok(Json(DataResponse { data: version }))
}

/// DELETE /api/v1/tracks/{id}/versions/{version_id}
///
/// Delete a version and its audio file. Refuses to delete the active
/// version or the only remaining version, so a track never loses its last
/// version. Owner only.
pub async fn delete(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((track_id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let track = ensure_version_in_owned_track(&state, track_id, version_id, &auth_user).await?;

    if track.active_version_id == Some(version_id) {
        return Err(AppError::Core(CoreError::Conflict(
            "Cannot delete the active version. Select a different active version first.".into(),
        )));
    }

    let count = VersionRepo::count_for_track(&state.pool, track_id).await?;
    if count <= 1 {
        return Err(AppError::Core(CoreError::Conflict(
            "Cannot delete the only version of a track".into(),
        )));
    }

    let audio = AudioFileRepo::find_by_version(&state.pool, version_id).await?;
    VersionRepo::delete(&state.pool, version_id).await?;

    if let Some(audio) = audio {
        if let Err(e) = state.store.delete(&audio.file_key).await {
            tracing::error!(
                version_id,
                key = %audio.file_key,
                error = %e,
                "Failed to delete storage object for deleted version",
            );
        }
    }

    tracing::info!(track_id, version_id, "Version deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Verify the version exists, belongs to the given track, and the caller
/// owns the track. Returns the track row.
async fn ensure_version_in_owned_track(
    state: &AppState,
    track_id: DbId,
    version_id: DbId,
    auth_user: &AuthUser,
) -> AppResult<Track> {
    let track = ensure_track_owned(&state.pool, track_id, auth_user).await?;

    let version = VersionRepo::find_by_id(&state.pool, version_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TrackVersion",
            id: version_id,
        }))?;

    if version.track_id != track_id {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "TrackVersion",
            id: version_id,
        }));
    }
    Ok(track)
}
