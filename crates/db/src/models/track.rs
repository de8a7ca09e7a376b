//! Track entity model and DTOs.

use mixdown_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `tracks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Track {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub description: Option<String>,
    /// The version designated as canonical for playback, if any.
    pub active_version_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new track.
#[derive(Debug, Clone)]
pub struct CreateTrack {
    pub user_id: DbId,
    pub title: String,
    pub description: Option<String>,
}

/// DTO for renaming or re-describing a track. All fields optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTrack {
    pub title: Option<String>,
    pub description: Option<String>,
}
