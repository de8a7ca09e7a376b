//! Handlers for the `/tracks` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mixdown_core::error::CoreError;
use mixdown_core::types::{DbId, Timestamp};
use mixdown_db::models::audio_file::StoredFileInput;
use mixdown_db::models::track::{CreateTrack, Track, UpdateTrack};
use mixdown_db::models::version::VersionWithFile;
use mixdown_db::repositories::{AudioFileRepo, TrackRepo, VersionRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /tracks`.
///
/// `file` is the upload relay's response, echoed back: the client uploads
/// first, then creates the records referencing the returned storage key.
#[derive(Debug, Deserialize)]
pub struct CreateTrackRequest {
    pub title: String,
    pub description: Option<String>,
    pub file: StoredFileInput,
}

/// One version in a track detail response.
#[derive(Debug, Serialize)]
pub struct VersionView {
    pub id: DbId,
    pub version_number: i32,
    pub title: String,
    pub created_at: Timestamp,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
    /// URL the player streams this version's audio from.
    pub playback_url: Option<String>,
}

/// A track with its full version list.
#[derive(Debug, Serialize)]
pub struct TrackDetail {
    #[serde(flatten)]
    pub track: Track,
    pub versions: Vec<VersionView>,
}

impl From<VersionWithFile> for VersionView {
    fn from(v: VersionWithFile) -> Self {
        let playback_url = v.file_key.as_deref().map(playback_url_for_key);
        Self {
            id: v.id,
            version_number: v.version_number,
            title: v.title,
            created_at: v.created_at,
            filename: v.filename,
            content_type: v.content_type,
            size_bytes: v.size_bytes,
            playback_url,
        }
    }
}

/// Derive the playback URL the browser audio element streams from.
pub fn playback_url_for_key(key: &str) -> String {
    format!("/api/v1/storage/{key}")
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/tracks
///
/// Create a track together with its first version and audio file record,
/// referencing a previously uploaded storage key. The first version becomes
/// the active version.
pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<CreateTrackRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<TrackDetail>>)> {
    if input.title.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Track title must not be empty".into(),
        )));
    }

    let (track, _version, _audio) = TrackRepo::create_with_first_version(
        &state.pool,
        &CreateTrack {
            user_id: auth_user.user_id,
            title: input.title.trim().to_string(),
            description: input.description.clone(),
        },
        &input.file,
    )
    .await?;

    tracing::info!(
        track_id = track.id,
        user_id = auth_user.user_id,
        key = %input.file.key,
        "Track created",
    );

    let detail = track_detail(&state, track).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/v1/tracks
///
/// List the caller's tracks, most recently updated first.
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Track>>>> {
    let tracks = TrackRepo::list_by_user(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse { data: tracks }))
}

/// GET /api/v1/tracks/{id}
///
/// Fetch one of the caller's tracks with its full version list.
pub async fn get_by_id(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TrackDetail>>> {
    let track = ensure_track_owned(&state.pool, id, &auth_user).await?;
    let detail = track_detail(&state, track).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// PATCH /api/v1/tracks/{id}
///
/// Rename or re-describe a track.
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTrack>,
) -> AppResult<Json<DataResponse<Track>>> {
    ensure_track_owned(&state.pool, id, &auth_user).await?;

    if let Some(title) = &input.title {
        if title.trim().is_empty() {
            return Err(AppError::Core(CoreError::Validation(
                "Track title must not be empty".into(),
            )));
        }
    }

    let track = TrackRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Track",
            id,
        }))?;

    Ok(Json(DataResponse { data: track }))
}

/// DELETE /api/v1/tracks/{id}
///
/// Delete a track and all its versions and audio file records, then delete
/// the underlying storage objects. Record deletion and object deletion are
/// separate, non-atomic steps; a failed object delete is logged and leaves
/// an orphan visible to the admin orphan report.
pub async fn delete(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    ensure_track_owned(&state.pool, id, &auth_user).await?;

    let files = AudioFileRepo::list_by_track(&state.pool, id).await?;
    TrackRepo::delete(&state.pool, id).await?;

    for file in &files {
        if let Err(e) = state.store.delete(&file.file_key).await {
            tracing::error!(
                track_id = id,
                key = %file.file_key,
                error = %e,
                "Failed to delete storage object for deleted track",
            );
        }
    }

    tracing::info!(track_id = id, user_id = auth_user.user_id, "Track deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/tracks/{id}/active-version/{version_id}
///
/// Designate the version the player should treat as canonical.
pub async fn set_active_version(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Track>>> {
    ensure_track_owned(&state.pool, id, &auth_user).await?;

    let track = TrackRepo::set_active_version(&state.pool, id, version_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TrackVersion",
            id: version_id,
        }))?;

    tracing::info!(track_id = id, version_id, "Active version changed");
    Ok(Json(DataResponse { data: track }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Verify that a track exists and belongs to the caller, returning the row.
pub async fn ensure_track_owned(
    pool: &sqlx::PgPool,
    id: DbId,
    auth_user: &AuthUser,
) -> AppResult<Track> {
    let track = TrackRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Track",
            id,
        }))?;

    if track.user_id != auth_user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not own this track".into(),
        )));
    }
    Ok(track)
}

/// Assemble a [`TrackDetail`] from a track row.
async fn track_detail(state: &AppState, track: Track) -> AppResult<TrackDetail> {
    let versions = VersionRepo::list_by_track_with_file(&state.pool, track.id)
        .await?
        .into_iter()
        .map(VersionView::from)
        .collect();
    Ok(TrackDetail { track, versions })
}
