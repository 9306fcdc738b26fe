use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::{Error as ObjectStoreError, ObjectStore, PutPayload, path::Path as ObjectPath};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

use super::config::S3ArtifactConfig;
use super::{ArtifactRef, ArtifactStore, StorageError, StorageResult, is_expired};

/// Artifact store on top of any [`ObjectStore`].
///
/// Object keys are `{prefix}/{reference}`, or just `{reference}` without a
/// prefix. A single `put` is atomic for every supported backend.
pub struct ObjectArtifactStore {
    store: Arc<dyn ObjectStore>,
    prefix: Option<String>,
    ttl: Duration,
}

impl ObjectArtifactStore {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: Option<&str>, ttl: Duration) -> Self {
        let prefix = prefix
            .map(|p| p.trim().trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
        Self { store, prefix, ttl }
    }

    /// Build an S3-backed store
    pub fn from_s3_config(config: &S3ArtifactConfig, ttl: Duration) -> StorageResult<Self> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::Configuration(
                "ARTIFACT_S3_BUCKET is required for the s3 backend".to_string(),
            ));
        }

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);
        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        if let Some(access_key) = &config.access_key {
            builder = builder.with_access_key_id(access_key);
        }
        if let Some(secret_key) = &config.secret_key {
            builder = builder.with_secret_access_key(secret_key);
        }

        let s3 = builder
            .build()
            .map_err(|e| StorageError::Configuration(e.to_string()))?;

        Ok(Self::new(Arc::new(s3), config.prefix.as_deref(), ttl))
    }

    fn object_path(&self, reference: &ArtifactRef) -> ObjectPath {
        match &self.prefix {
            Some(prefix) => ObjectPath::from(format!("{}/{}", prefix, reference)),
            None => ObjectPath::from(reference.as_str()),
        }
    }

    fn prefix_path(&self) -> Option<ObjectPath> {
        self.prefix.as_deref().map(ObjectPath::from)
    }
}

fn to_system_time(timestamp_secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(timestamp_secs.max(0) as u64)
}

fn backend_error(err: ObjectStoreError) -> StorageError {
    StorageError::Backend(err.to_string())
}

#[async_trait]
impl ArtifactStore for ObjectArtifactStore {
    async fn save(&self, payload: Bytes) -> StorageResult<ArtifactRef> {
        if payload.is_empty() {
            return Err(StorageError::EmptyPayload);
        }

        let reference = ArtifactRef::generate();
        let path = self.object_path(&reference);
        let size = payload.len();

        self.store
            .put(&path, PutPayload::from(payload))
            .await
            .map_err(|e| {
                error!(key = %path, error = %e, "Failed to upload artifact");
                backend_error(e)
            })?;

        debug!(reference = %reference, key = %path, bytes = size, "Stored artifact in object storage");
        Ok(reference)
    }

    async fn open(&self, reference: &ArtifactRef) -> StorageResult<Bytes> {
        let path = self.object_path(reference);

        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(ObjectStoreError::NotFound { .. }) => {
                return Err(StorageError::NotFound(reference.to_string()));
            }
            Err(e) => return Err(backend_error(e)),
        };

        if is_expired(to_system_time(result.meta.last_modified.timestamp()), self.ttl) {
            return Err(StorageError::NotFound(reference.to_string()));
        }

        result.bytes().await.map_err(backend_error)
    }

    async fn evict(&self, reference: &ArtifactRef) -> StorageResult<()> {
        match self.store.delete(&self.object_path(reference)).await {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn purge_expired(&self) -> StorageResult<usize> {
        let prefix = self.prefix_path();
        let objects: Vec<_> = self
            .store
            .list(prefix.as_ref())
            .try_collect()
            .await
            .map_err(backend_error)?;

        let mut removed = 0;
        for meta in objects {
            if !is_expired(to_system_time(meta.last_modified.timestamp()), self.ttl) {
                continue;
            }
            match self.store.delete(&meta.location).await {
                Ok(()) => removed += 1,
                Err(ObjectStoreError::NotFound { .. }) => {}
                Err(e) => warn!(key = %meta.location, error = %e, "Failed to delete expired artifact"),
            }
        }

        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "object_store"
    }
}
