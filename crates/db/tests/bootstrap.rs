use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify schema.
#[sqlx::test(migrations = "./migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    // Health check
    mixdown_db::health_check(&pool).await.unwrap();

    // Verify the core tables exist and are queryable.
    let tables = [
        "users",
        "user_sessions",
        "account_tokens",
        "tracks",
        "track_versions",
        "audio_files",
    ];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 0, "{table} should exist and start empty");
    }
}

/// Version numbers are unique per track at the schema level.
#[sqlx::test(migrations = "./migrations")]
async fn test_version_number_uniqueness(pool: PgPool) {
    let user: (i64,) = sqlx::query_as(
        "INSERT INTO users (username, email, password_hash) \
         VALUES ('schema', 'schema@example.com', 'x') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let track: (i64,) =
        sqlx::query_as("INSERT INTO tracks (user_id, title) VALUES ($1, 'T') RETURNING id")
            .bind(user.0)
            .fetch_one(&pool)
            .await
            .unwrap();

    sqlx::query("INSERT INTO track_versions (track_id, version_number, title) VALUES ($1, 1, 'v1')")
        .bind(track.0)
        .execute(&pool)
        .await
        .unwrap();

    let duplicate = sqlx::query(
        "INSERT INTO track_versions (track_id, version_number, title) VALUES ($1, 1, 'dup')",
    )
    .bind(track.0)
    .execute(&pool)
    .await;
    assert!(duplicate.is_err(), "duplicate version number should violate uq constraint");
}

/// Deleting a track cascades to versions and audio files.
#[sqlx::test(migrations = "./migrations")]
async fn test_track_delete_cascades(pool: PgPool) {
    let user: (i64,) = sqlx::query_as(
        "INSERT INTO users (username, email, password_hash) \
         VALUES ('cascade', 'cascade@example.com', 'x') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let track: (i64,) =
        sqlx::query_as("INSERT INTO tracks (user_id, title) VALUES ($1, 'T') RETURNING id")
            .bind(user.0)
            .fetch_one(&pool)
            .await
            .unwrap();

    let version: (i64,) = sqlx::query_as(
        "INSERT INTO track_versions (track_id, version_number, title) \
         VALUES ($1, 1, 'v1') RETURNING id",
    )
    .bind(track.0)
    .fetch_one(&pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO audio_files (version_id, file_key, filename, content_type, size_bytes) \
         VALUES ($1, 'k/a.wav', 'a.wav', 'audio/wav', 3)",
    )
    .bind(version.0)
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM tracks WHERE id = $1")
        .bind(track.0)
        .execute(&pool)
        .await
        .unwrap();

    let versions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM track_versions")
        .fetch_one(&pool)
        .await
        .unwrap();
    let files: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audio_files")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(versions.0, 0);
    assert_eq!(files.0, 0);
}
