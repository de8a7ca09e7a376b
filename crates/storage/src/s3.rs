//! S3-backed object store.
//!
//! Credentials come from the standard AWS environment/profile chain via
//! `aws-config`; only the bucket and region are Mixdown configuration.

use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::{validate_key, ObjectMeta, ObjectStore, StorageError, StoredObject};

/// Fallback content type for objects stored without one.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Object store backed by one S3 bucket.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Connect using the default AWS credential chain.
    pub async fn connect(bucket: &str, region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self {
            client: Client::new(&config),
            bucket: bucket.to_string(),
        }
    }

    /// Build from an existing client (used against S3-compatible endpoints).
    pub fn with_client(client: Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        validate_key(key)?;

        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(|svc| svc.is_no_such_key())
                {
                    return Ok(None);
                }
                return Err(StorageError::Backend(err.to_string()));
            }
        };

        let content_type = output
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .into_bytes()
            .to_vec();

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
        validate_key(key)?;
        let size = bytes.len() as i64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(ObjectMeta {
            key: key.to_string(),
            size,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<ObjectMeta>, StorageError> {
        let mut objects = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| StorageError::Backend(e.to_string()))?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                objects.push(ObjectMeta {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0),
                });
            }
        }

        Ok(objects)
    }
}
