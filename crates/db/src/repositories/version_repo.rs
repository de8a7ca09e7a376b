//! Repository for the `track_versions` table.

use mixdown_core::types::DbId;
use sqlx::PgPool;

use crate::models::audio_file::{AudioFile, StoredFileInput};
use crate::models::version::{CreateVersion, TrackVersion, VersionWithFile};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, track_id, version_number, title, created_at, updated_at";

const AUDIO_COLUMNS: &str =
    "id, version_id, file_key, filename, content_type, size_bytes, created_at";

/// Provides CRUD and version-management operations for track versions.
pub struct VersionRepo;

impl VersionRepo {
    /// Insert a new version, auto-assigning the next version number for the
    /// track.
    pub async fn create(
        pool: &PgPool,
        input: &CreateVersion,
    ) -> Result<TrackVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO track_versions (track_id, version_number, title)
             VALUES (
                $1,
                (SELECT COALESCE(MAX(version_number), 0) + 1 FROM track_versions WHERE track_id = $1),
                $2
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrackVersion>(&query)
            .bind(input.track_id)
            .bind(&input.title)
            .fetch_one(pool)
            .await
    }

    /// Insert a new version together with its audio file record in one
    /// transaction. Used by the per-track "add version" upload endpoint.
    pub async fn create_with_file(
        pool: &PgPool,
        input: &CreateVersion,
        file: &StoredFileInput,
    ) -> Result<(TrackVersion, AudioFile), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let version_query = format!(
            "INSERT INTO track_versions (track_id, version_number, title)
             VALUES (
                $1,
                (SELECT COALESCE(MAX(version_number), 0) + 1 FROM track_versions WHERE track_id = $1),
                $2
             )
             RETURNING {COLUMNS}"
        );
        let version = sqlx::query_as::<_, TrackVersion>(&version_query)
            .bind(input.track_id)
            .bind(&input.title)
            .fetch_one(&mut *tx)
            .await?;

        let audio_query = format!(
            "INSERT INTO audio_files (version_id, file_key, filename, content_type, size_bytes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {AUDIO_COLUMNS}"
        );
        let audio = sqlx::query_as::<_, AudioFile>(&audio_query)
            .bind(version.id)
            .bind(&file.key)
            .bind(&file.filename)
            .bind(&file.content_type)
            .bind(file.size)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((version, audio))
    }

    /// Find a version by its internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TrackVersion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM track_versions WHERE id = $1");
        sqlx::query_as::<_, TrackVersion>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all versions for a track in ascending version-number order,
    /// each joined with its audio file when one is attached.
    pub async fn list_by_track_with_file(
        pool: &PgPool,
        track_id: DbId,
    ) -> Result<Vec<VersionWithFile>, sqlx::Error> {
        sqlx::query_as::<_, VersionWithFile>(
            "SELECT v.id, v.track_id, v.version_number, v.title, v.created_at,
                    a.file_key, a.filename, a.content_type, a.size_bytes
             FROM track_versions v
             LEFT JOIN audio_files a ON a.version_id = v.id
             WHERE v.track_id = $1
             ORDER BY v.version_number ASC",
        )
        .bind(track_id)
        .fetch_all(pool)
        .await
    }

    /// Edit a version's title. Titles are the only mutable field.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_title(
        pool: &PgPool,
        id: DbId,
        title: &str,
    ) -> Result<Option<TrackVersion>, sqlx::Error> {
        let query = format!(
            "UPDATE track_versions SET title = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrackVersion>(&query)
            .bind(id)
            .bind(title)
            .fetch_optional(pool)
            .await
    }

    /// Count the versions a track has.
    pub async fn count_for_track(pool: &PgPool, track_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM track_versions WHERE track_id = $1")
                .bind(track_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Delete a version. Its audio file record cascades.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM track_versions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
