//! Object storage seam.
//!
//! The upload relay and the storage-serving routes talk to a bucket through
//! the [`ObjectStore`] trait: `get` / `put` / `delete` / `list`. Two
//! backends are provided -- a local filesystem store for development and
//! single-node deployments, and an S3 store for bucket-backed deployments.
//! The backend is selected by [`StorageConfig`].

mod fs;
mod s3;

use std::sync::Arc;

pub use fs::FsStore;
pub use s3::S3Store;

/// Error type for storage backend failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The key is empty, absolute, or attempts path traversal.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Local filesystem I/O failure.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object metadata could not be read or written.
    #[error("Storage metadata error: {0}")]
    Metadata(String),

    /// Remote backend (S3) failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// A fully fetched object: its bytes plus declared content type.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl StoredObject {
    pub fn size(&self) -> i64 {
        self.bytes.len() as i64
    }
}

/// Descriptor of one object in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ObjectMeta {
    pub key: String,
    pub size: i64,
}

/// The bucket operations Mixdown consumes.
///
/// Exactly one `put` happens per accepted upload; `put` is not retried by
/// callers, and a failed `put` must leave no partial object behind that a
/// later `get` would serve.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object. `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    /// Write an object under `key` with its declared content type,
    /// returning the stored descriptor. Overwrites an existing object.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ObjectMeta, StorageError>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Descriptors of every object in the bucket.
    async fn list(&self) -> Result<Vec<ObjectMeta>, StorageError>;
}

/// Which backend to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Objects under a local base directory.
    Local { base_path: String },
    /// An S3 (or compatible) bucket.
    S3 { bucket: String, region: String },
}

/// Storage configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// Default base directory for the local backend.
const DEFAULT_LOCAL_PATH: &str = "storage/objects";

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var           | Backend | Required | Default           |
    /// |-------------------|---------|----------|-------------------|
    /// | `STORAGE_BACKEND` | --      | no       | `local`           |
    /// | `STORAGE_PATH`    | local   | no       | `storage/objects` |
    /// | `STORAGE_BUCKET`  | s3      | **yes**  | --                |
    /// | `STORAGE_REGION`  | s3      | **yes**  | --                |
    ///
    /// # Panics
    ///
    /// Panics when `STORAGE_BACKEND` names an unknown backend or the s3
    /// backend is selected without bucket/region -- misconfiguration should
    /// fail at startup.
    pub fn from_env() -> Self {
        let backend_name =
            std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());

        let backend = match backend_name.as_str() {
            "local" => StorageBackend::Local {
                base_path: std::env::var("STORAGE_PATH")
                    .unwrap_or_else(|_| DEFAULT_LOCAL_PATH.into()),
            },
            "s3" => StorageBackend::S3 {
                bucket: std::env::var("STORAGE_BUCKET")
                    .expect("STORAGE_BUCKET must be set for the s3 backend"),
                region: std::env::var("STORAGE_REGION")
                    .expect("STORAGE_REGION must be set for the s3 backend"),
            },
            other => panic!("Unknown STORAGE_BACKEND '{other}'. Must be one of: local, s3"),
        };

        Self { backend }
    }
}

/// Construct the configured [`ObjectStore`].
pub async fn init_store(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match &config.backend {
        StorageBackend::Local { base_path } => {
            let store = FsStore::new(base_path).await?;
            tracing::info!(base_path = %base_path, "Local object store initialized");
            Ok(Arc::new(store))
        }
        StorageBackend::S3 { bucket, region } => {
            let store = S3Store::connect(bucket, region).await;
            tracing::info!(bucket = %bucket, region = %region, "S3 object store initialized");
            Ok(Arc::new(store))
        }
    }
}

/// Validate a storage key for backend use.
///
/// Keys are opaque to callers but must be safe to use as relative paths:
/// non-empty, relative, and free of `..` segments.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key is empty".into()));
    }
    if key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "key must be relative: {key}"
        )));
    }
    if key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(format!(
            "key must not contain '..' segments: {key}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_keys_pass() {
        assert!(validate_key("a.wav").is_ok());
        assert!(validate_key("uuid/a.wav").is_ok());
        assert!(validate_key("a/b/c.mp3").is_ok());
    }

    #[test]
    fn traversal_and_absolute_keys_fail() {
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("../secret").is_err());
        assert!(validate_key("a/../../b").is_err());
    }
}
