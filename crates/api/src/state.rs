use std::sync::Arc;

use mixdown_storage::ObjectStore;

use crate::config::ServerConfig;
use crate::mailer::Mailer;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: mixdown_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Object storage bucket backend.
    pub store: Arc<dyn ObjectStore>,
    /// Transactional mailer; `None` when SMTP is not configured.
    pub mailer: Option<Arc<Mailer>>,
}
