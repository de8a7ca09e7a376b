//! Background maintenance tasks.
//!
//! One periodic sweep deletes expired/revoked sessions and spent account
//! tokens. Runs until the cancellation token fires at shutdown.

use std::time::Duration;

use mixdown_db::repositories::{AccountTokenRepo, SessionRepo};
use mixdown_db::DbPool;
use tokio_util::sync::CancellationToken;

/// Interval between cleanup sweeps.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Periodically delete expired sessions and account tokens.
pub async fn run_cleanup(pool: DbPool, cancel: CancellationToken) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("Cleanup task stopping");
                return;
            }
            () = tokio::time::sleep(CLEANUP_INTERVAL) => {}
        }

        match SessionRepo::cleanup_expired(&pool).await {
            Ok(count) if count > 0 => {
                tracing::info!(count, "Deleted expired sessions");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Session cleanup failed"),
        }

        match AccountTokenRepo::cleanup_expired(&pool).await {
            Ok(count) if count > 0 => {
                tracing::info!(count, "Deleted expired account tokens");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Account token cleanup failed"),
        }
    }
}
