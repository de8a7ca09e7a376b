//! Repository for the `audio_files` table.

use mixdown_core::types::DbId;
use sqlx::PgPool;

use crate::models::audio_file::{AudioFile, CreateAudioFile};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, version_id, file_key, filename, content_type, size_bytes, created_at";

/// Provides CRUD operations for audio file records.
pub struct AudioFileRepo;

impl AudioFileRepo {
    /// Insert a new audio file record, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAudioFile,
    ) -> Result<AudioFile, sqlx::Error> {
        let query = format!(
            "INSERT INTO audio_files (version_id, file_key, filename, content_type, size_bytes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AudioFile>(&query)
            .bind(input.version_id)
            .bind(&input.file_key)
            .bind(&input.filename)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .fetch_one(pool)
            .await
    }

    /// Find an audio file by its storage key.
    pub async fn find_by_key(
        pool: &PgPool,
        file_key: &str,
    ) -> Result<Option<AudioFile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM audio_files WHERE file_key = $1");
        sqlx::query_as::<_, AudioFile>(&query)
            .bind(file_key)
            .fetch_optional(pool)
            .await
    }

    /// Find the audio file attached to a version, if any.
    pub async fn find_by_version(
        pool: &PgPool,
        version_id: DbId,
    ) -> Result<Option<AudioFile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM audio_files WHERE version_id = $1");
        sqlx::query_as::<_, AudioFile>(&query)
            .bind(version_id)
            .fetch_optional(pool)
            .await
    }

    /// List the audio files attached to any version of a track.
    pub async fn list_by_track(
        pool: &PgPool,
        track_id: DbId,
    ) -> Result<Vec<AudioFile>, sqlx::Error> {
        sqlx::query_as::<_, AudioFile>(
            "SELECT a.id, a.version_id, a.file_key, a.filename, a.content_type, \
                    a.size_bytes, a.created_at
             FROM audio_files a
             JOIN track_versions v ON v.id = a.version_id
             WHERE v.track_id = $1",
        )
        .bind(track_id)
        .fetch_all(pool)
        .await
    }

    /// All storage keys referenced by any audio file record. Used by the
    /// orphaned-object report.
    pub async fn list_keys(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT file_key FROM audio_files")
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }
}
