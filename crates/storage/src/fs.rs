//! Local filesystem object store.
//!
//! Objects live at `<base>/<key>`; the declared content type is kept in a
//! JSON sidecar at `<base>/<key>.meta` so a later `get` serves the same
//! content type the uploader declared.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{validate_key, ObjectMeta, ObjectStore, StorageError, StoredObject};

/// Sidecar filename suffix.
const META_SUFFIX: &str = ".meta";

/// Fallback content type for objects whose sidecar is missing.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Sidecar payload.
#[derive(Debug, Serialize, Deserialize)]
struct SidecarMeta {
    content_type: String,
}

/// Object store rooted at a local base directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    base: PathBuf,
}

impl FsStore {
    /// Create the store, creating the base directory if needed.
    pub async fn new(base_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base = base_path.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&base).await?;
        Ok(Self { base })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.base.join(key))
    }

    fn meta_path(object_path: &Path) -> PathBuf {
        let mut name = object_path.as_os_str().to_owned();
        name.push(META_SUFFIX);
        PathBuf::from(name)
    }
}

#[async_trait::async_trait]
impl ObjectStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let path = self.object_path(key)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let content_type = match tokio::fs::read(Self::meta_path(&path)).await {
            Ok(raw) => serde_json::from_slice::<SidecarMeta>(&raw)
                .map_err(|e| StorageError::Metadata(e.to_string()))?
                .content_type,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                FALLBACK_CONTENT_TYPE.to_string()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(StoredObject {
            bytes,
            content_type,
        }))
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ObjectMeta, StorageError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to a temp name and rename so a failed write never leaves a
        // partial object a later get would serve.
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        let size = bytes.len() as i64;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        let meta = SidecarMeta {
            content_type: content_type.to_string(),
        };
        let raw = serde_json::to_vec(&meta).map_err(|e| StorageError::Metadata(e.to_string()))?;
        tokio::fs::write(Self::meta_path(&path), raw).await?;

        Ok(ObjectMeta {
            key: key.to_string(),
            size,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        match tokio::fs::remove_file(Self::meta_path(&path)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ObjectMeta>, StorageError> {
        let mut objects = Vec::new();
        let mut pending = vec![self.base.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                let name = path.to_string_lossy();
                if name.ends_with(META_SUFFIX) || name.ends_with(".tmp") {
                    continue;
                }
                let key = path
                    .strip_prefix(&self.base)
                    .map_err(|e| StorageError::Metadata(e.to_string()))?
                    .to_string_lossy()
                    .into_owned();
                let size = entry.metadata().await?.len() as i64;
                objects.push(ObjectMeta { key, size });
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, FsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn put_then_get_round_trips_bytes_and_content_type() {
        let (_dir, store) = store().await;
        let bytes = b"abc".to_vec();

        let meta = store.put("a.wav", bytes.clone(), "audio/wav").await.unwrap();
        assert_eq!(meta.key, "a.wav");
        assert_eq!(meta.size, 3);

        let object = store.get("a.wav").await.unwrap().unwrap();
        assert_eq!(object.bytes, bytes);
        assert_eq!(object.content_type, "audio/wav");
        assert_eq!(object.size(), 3);
    }

    #[tokio::test]
    async fn get_missing_key_returns_none() {
        let (_dir, store) = store().await;
        assert!(store.get("nope.wav").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn nested_keys_create_directories() {
        let (_dir, store) = store().await;
        store
            .put("some-uuid/mix.mp3", vec![1, 2, 3, 4], "audio/mpeg")
            .await
            .unwrap();
        let object = store.get("some-uuid/mix.mp3").await.unwrap().unwrap();
        assert_eq!(object.bytes, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn delete_removes_object_and_is_idempotent() {
        let (_dir, store) = store().await;
        store.put("a.wav", vec![0; 10], "audio/wav").await.unwrap();

        store.delete("a.wav").await.unwrap();
        assert!(store.get("a.wav").await.unwrap().is_none());

        // Deleting a missing key is not an error.
        store.delete("a.wav").await.unwrap();
    }

    #[tokio::test]
    async fn put_overwrites_existing_object() {
        let (_dir, store) = store().await;
        store.put("a.wav", vec![1], "audio/wav").await.unwrap();
        store.put("a.wav", vec![2, 3], "audio/mpeg").await.unwrap();

        let object = store.get("a.wav").await.unwrap().unwrap();
        assert_eq!(object.bytes, vec![2, 3]);
        assert_eq!(object.content_type, "audio/mpeg");
    }

    #[tokio::test]
    async fn list_returns_objects_without_sidecars() {
        let (_dir, store) = store().await;
        store.put("a.wav", vec![0; 3], "audio/wav").await.unwrap();
        store.put("u1/b.mp3", vec![0; 5], "audio/mpeg").await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(
            listed,
            vec![
                ObjectMeta {
                    key: "a.wav".into(),
                    size: 3
                },
                ObjectMeta {
                    key: "u1/b.mp3".into(),
                    size: 5
                },
            ]
        );
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let (_dir, store) = store().await;
        let err = store.put("../escape", vec![1], "audio/wav").await;
        assert!(matches!(err, Err(StorageError::InvalidKey(_))));
        let err = store.get("/abs").await;
        assert!(matches!(err, Err(StorageError::InvalidKey(_))));
    }
}
