//! Repository for the `tracks` table.

use mixdown_core::types::DbId;
use sqlx::PgPool;

use crate::models::audio_file::{AudioFile, StoredFileInput};
use crate::models::track::{CreateTrack, Track, UpdateTrack};
use crate::models::version::TrackVersion;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, user_id, title, description, active_version_id, created_at, updated_at";

const VERSION_COLUMNS: &str =
    "id, track_id, version_number, title, created_at, updated_at";

const AUDIO_COLUMNS: &str =
    "id, version_id, file_key, filename, content_type, size_bytes, created_at";

/// Provides CRUD operations for tracks.
pub struct TrackRepo;

impl TrackRepo {
    /// Create a track together with its first version and audio file record
    /// in one transaction, so a persisted track always has at least one
    /// version.
    ///
    /// The first version becomes the track's active version.
    pub async fn create_with_first_version(
        pool: &PgPool,
        input: &CreateTrack,
        file: &StoredFileInput,
    ) -> Result<(Track, TrackVersion, AudioFile), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let track_query = format!(
            "INSERT INTO tracks (user_id, title, description)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let track = sqlx::query_as::<_, Track>(&track_query)
            .bind(input.user_id)
            .bind(&input.title)
            .bind(&input.description)
            .fetch_one(&mut *tx)
            .await?;

        let version_query = format!(
            "INSERT INTO track_versions (track_id, version_number, title)
             VALUES ($1, 1, $2)
             RETURNING {VERSION_COLUMNS}"
        );
        let version = sqlx::query_as::<_, TrackVersion>(&version_query)
            .bind(track.id)
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

        let track_query = format!(
            "UPDATE tracks SET active_version_id = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let track = sqlx::query_as::<_, Track>(&track_query)
            .bind(track.id)
            .bind(version.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((track, version, audio))
    }

    /// Find a track by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Track>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tracks WHERE id = $1");
        sqlx::query_as::<_, Track>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's tracks, most recently updated first.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Track>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tracks WHERE user_id = $1 ORDER BY updated_at DESC"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Find the track owning the version that the given storage key's audio
    /// file is attached to.
    pub async fn find_by_file_key(
        pool: &PgPool,
        file_key: &str,
    ) -> Result<Option<Track>, sqlx::Error> {
        let query = format!(
            "SELECT t.id, t.user_id, t.title, t.description, t.active_version_id, \
                    t.created_at, t.updated_at
             FROM tracks t
             JOIN track_versions v ON v.track_id = t.id
             JOIN audio_files a ON a.version_id = v.id
             WHERE a.file_key = $1"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(file_key)
            .fetch_optional(pool)
            .await
    }

    /// Rename or re-describe a track. Only non-`None` fields are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTrack,
    ) -> Result<Option<Track>, sqlx::Error> {
        let query = format!(
            "UPDATE tracks SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Designate the active version. The version must belong to the track.
    ///
    /// Returns `None` when the track does not exist or the version is not
    /// one of its versions.
    pub async fn set_active_version(
        pool: &PgPool,
        track_id: DbId,
        version_id: DbId,
    ) -> Result<Option<Track>, sqlx::Error> {
        let query = format!(
            "UPDATE tracks SET active_version_id = $2, updated_at = NOW()
             WHERE id = $1
               AND EXISTS (
                   SELECT 1 FROM track_versions
                   WHERE id = $2 AND track_id = $1
               )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(track_id)
            .bind(version_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a track. Versions and audio file records cascade.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tracks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
