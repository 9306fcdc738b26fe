//! Ephemeral audio artifact storage
//!
//! Synthesized narratives are written once under a freshly generated
//! reference and served until their time-to-live elapses. Three backends
//! share the [`ArtifactStore`] contract:
//!
//! - [`MemoryArtifactStore`]: moka cache with per-entry TTL and a byte budget
//! - [`FilesystemArtifactStore`]: one file per artifact, written atomically
//! - [`ObjectArtifactStore`]: any `object_store` backend (S3 in production)
//!
//! Writes are all-or-nothing. A reference is only returned once the whole
//! payload is readable.

pub mod config;
mod filesystem;
mod memory;
mod object;

pub use config::{ArtifactBackend, ArtifactConfig, S3ArtifactConfig};
pub use filesystem::FilesystemArtifactStore;
pub use memory::MemoryArtifactStore;
pub use object::ObjectArtifactStore;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// File extension of every artifact reference
pub const ARTIFACT_EXTENSION: &str = "mp3";

/// MIME type artifacts are served with
pub const ARTIFACT_CONTENT_TYPE: &str = "audio/mpeg";

/// Opaque handle to a stored artifact, formatted `<uuid-v4-simple>.mp3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    /// Generate a fresh, collision-free reference
    pub fn generate() -> Self {
        Self(format!(
            "{}.{}",
            uuid::Uuid::new_v4().simple(),
            ARTIFACT_EXTENSION
        ))
    }

    /// Parse a reference received from a client.
    ///
    /// Only the exact shape produced by [`ArtifactRef::generate`] is accepted,
    /// so a parsed reference is always safe to use as a file name or object
    /// key.
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let stem = raw
            .strip_suffix(ARTIFACT_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(|| StorageError::NotFound(raw.to_string()))?;

        let valid = stem.len() == 32
            && stem
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(StorageError::NotFound(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path under which the artifact is served over HTTP
    pub fn url_path(&self) -> String {
        format!("/audio/{}", self.0)
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised by artifact stores
#[derive(Debug, Error)]
pub enum StorageError {
    /// Unknown, malformed or expired reference
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Refusing to store an empty artifact")]
    EmptyPayload,

    #[error("Artifact of {size} bytes exceeds store capacity of {capacity} bytes")]
    CapacityExceeded { size: usize, capacity: u64 },

    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact backend error: {0}")]
    Backend(String),

    #[error("Invalid artifact store configuration: {0}")]
    Configuration(String),
}

/// Result type for artifact operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persists audio payloads and resolves them by reference.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `payload` under a new reference. The reference is returned only
    /// after the complete payload is durable.
    async fn save(&self, payload: Bytes) -> StorageResult<ArtifactRef>;

    /// Read a stored payload. Expired artifacts yield [`StorageError::NotFound`].
    async fn open(&self, reference: &ArtifactRef) -> StorageResult<Bytes>;

    /// Remove an artifact. Removing an unknown reference is not an error.
    async fn evict(&self, reference: &ArtifactRef) -> StorageResult<()>;

    /// Reclaim every expired artifact, returning how many were removed.
    async fn purge_expired(&self) -> StorageResult<usize>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Build the store selected by `config`
pub fn create_artifact_store(config: &ArtifactConfig) -> StorageResult<Arc<dyn ArtifactStore>> {
    let store: Arc<dyn ArtifactStore> = match config.backend {
        ArtifactBackend::Memory => Arc::new(MemoryArtifactStore::new(
            config.ttl(),
            config.max_memory_bytes,
        )),
        ArtifactBackend::Filesystem => Arc::new(FilesystemArtifactStore::new(
            config.dir.clone(),
            config.ttl(),
        )),
        ArtifactBackend::S3 => {
            let s3 = config.s3.as_ref().ok_or_else(|| {
                StorageError::Configuration("s3 backend selected without s3 settings".to_string())
            })?;
            Arc::new(ObjectArtifactStore::from_s3_config(s3, config.ttl())?)
        }
    };

    info!(
        backend = store.backend_name(),
        ttl_seconds = config.ttl_seconds,
        "Artifact store ready"
    );
    Ok(store)
}

/// Periodically purge expired artifacts until the task is aborted.
pub fn spawn_sweeper(store: Arc<dyn ArtifactStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!(
                    backend = store.backend_name(),
                    removed, "Purged expired artifacts"
                ),
                Err(e) => warn!(
                    backend = store.backend_name(),
                    error = %e,
                    "Artifact sweep failed"
                ),
            }
        }
    })
}

/// Whether something last modified at `modified` has outlived `ttl`.
fn is_expired(modified: SystemTime, ttl: Duration) -> bool {
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age > ttl)
        .unwrap_or(false)
}
