//! S3-compatible object store.
//!
//! Built for Cloudflare R2 (region `auto`, custom endpoint) but works with
//! any S3-compatible service that accepts path-style addressing.

use super::{ObjectInfo, ObjectStore, StoreError};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    error::{DisplayErrorContext, SdkError},
    primitives::ByteStream,
    Client,
};
use tracing::debug;

/// S3-compatible storage backend bound to a single bucket.
///
/// Uses the SDK's standard retry policy for transport errors only; the
/// pipeline itself never retries.
///
/// ```no_run
/// use bucket_image_optimizer::store::S3Store;
///
/// let store = S3Store::new(
///     "assets",
///     "https://<account>.r2.cloudflarestorage.com",
///     "access_key_id",
///     "secret_access_key",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(
        bucket: impl Into<String>,
        endpoint: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        let credentials = Credentials::new(key_id, key_secret, None, None, "r2-env");
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("auto"))
            .endpoint_url(endpoint)
            // Path-style addressing per compatibilità con R2/MinIO
            .force_path_style(true)
            .build();
        Self {
            client: Client::from_conf(config),
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn network<E, R>(err: SdkError<E, R>) -> StoreError
    where
        E: std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        StoreError::Network(DisplayErrorContext(&err).to_string())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(Self::network)?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    let size = object.size().unwrap_or(0).max(0) as u64;
                    objects.push(ObjectInfo::new(key, size));
                }
            }
        }

        debug!("Listed {} objects under '{}' in bucket {}", objects.len(), prefix, self.bucket);
        Ok(objects)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service) if service.is_no_such_key() => StoreError::NotFound(key.to_string()),
                _ => Self::network(err),
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Network(format!("reading body of {}: {}", key, e)))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(Self::network)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(Self::network)?;
        Ok(())
    }
}
