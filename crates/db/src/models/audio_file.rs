//! Audio file metadata model and DTOs.
//!
//! One row per object in the storage bucket. Created exactly once when the
//! storage write and metadata persist both succeed; never mutated.

use mixdown_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `audio_files` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AudioFile {
    pub id: DbId,
    pub version_id: DbId,
    /// Opaque key identifying the object in the storage bucket.
    pub file_key: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: Timestamp,
}

/// DTO for creating an audio file record.
#[derive(Debug, Clone)]
pub struct CreateAudioFile {
    pub version_id: DbId,
    pub file_key: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
}

/// Client-supplied description of an object already written to storage --
/// the upload relay's response, echoed back when creating records.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileInput {
    pub key: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
}
