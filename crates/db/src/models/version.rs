//! Track version entity model and DTOs.

use mixdown_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `track_versions` table.
///
/// Versions are numbered monotonically per track at creation and are
/// immutable afterwards except for title edits.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrackVersion {
    pub id: DbId,
    pub track_id: DbId,
    pub version_number: i32,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new version. The version number is assigned by the
/// repository.
#[derive(Debug, Clone)]
pub struct CreateVersion {
    pub track_id: DbId,
    pub title: String,
}

/// A version joined with its audio file, for track detail responses.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VersionWithFile {
    pub id: DbId,
    pub track_id: DbId,
    pub version_number: i32,
    pub title: String,
    pub created_at: Timestamp,
    pub file_key: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}
