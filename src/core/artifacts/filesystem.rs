use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

use super::{ARTIFACT_EXTENSION, ArtifactRef, ArtifactStore, StorageError, StorageResult, is_expired};

const PARTIAL_EXTENSION: &str = "partial";

/// Artifact store keeping one file per artifact in a local directory.
///
/// Payloads are written to `<reference>.partial` and renamed into place, so a
/// reader never observes a truncated file. Files older than `ttl` are treated
/// as missing and removed by [`ArtifactStore::purge_expired`].
pub struct FilesystemArtifactStore {
    dir: PathBuf,
    ttl: Duration,
}

impl FilesystemArtifactStore {
    pub fn new(dir: PathBuf, ttl: Duration) -> Self {
        Self { dir, ttl }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, reference: &ArtifactRef) -> PathBuf {
        self.dir.join(reference.as_str())
    }
}

#[async_trait]
impl ArtifactStore for FilesystemArtifactStore {
    async fn save(&self, payload: Bytes) -> StorageResult<ArtifactRef> {
        if payload.is_empty() {
            return Err(StorageError::EmptyPayload);
        }

        fs::create_dir_all(&self.dir).await?;

        let reference = ArtifactRef::generate();
        let path = self.path_for(&reference);
        let partial = path.with_extension(PARTIAL_EXTENSION);

        if let Err(e) = fs::write(&partial, &payload).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&partial, &path).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }

        debug!(
            reference = %reference,
            path = ?path,
            bytes = payload.len(),
            "Stored artifact on disk"
        );
        Ok(reference)
    }

    async fn open(&self, reference: &ArtifactRef) -> StorageResult<Bytes> {
        let path = self.path_for(reference);

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(reference.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if is_expired(metadata.modified()?, self.ttl) {
            let _ = fs::remove_file(&path).await;
            return Err(StorageError::NotFound(reference.to_string()));
        }

        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            // Swept between the metadata check and the read
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn evict(&self, reference: &ArtifactRef) -> StorageResult<()> {
        match fs::remove_file(self.path_for(reference)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn purge_expired(&self) -> StorageResult<usize> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let ours = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == ARTIFACT_EXTENSION || ext == PARTIAL_EXTENSION);
            if !ours {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            if !is_expired(modified, self.ttl) {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = ?path, error = %e, "Failed to remove expired artifact"),
            }
        }

        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_then_open() {
        let temp_dir = tempdir().unwrap();
        let store = FilesystemArtifactStore::new(temp_dir.path().join("audio"), Duration::from_secs(60));

        let reference = store.save(Bytes::from_static(b"mp3 bytes")).await.unwrap();
        assert!(temp_dir.path().join("audio").join(reference.as_str()).is_file());
        assert_eq!(&store.open(&reference).await.unwrap()[..], b"mp3 bytes");
    }

    #[tokio::test]
    async fn test_no_partial_files_left_behind() {
        let temp_dir = tempdir().unwrap();
        let store = FilesystemArtifactStore::new(temp_dir.path().to_path_buf(), Duration::from_secs(60));
        store.save(Bytes::from_static(b"data")).await.unwrap();

        let partials = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == PARTIAL_EXTENSION))
            .count();
        assert_eq!(partials, 0);
    }

    #[tokio::test]
    async fn test_unknown_reference_not_found() {
        let temp_dir = tempdir().unwrap();
        let store = FilesystemArtifactStore::new(temp_dir.path().to_path_buf(), Duration::from_secs(60));
        assert!(matches!(
            store.open(&ArtifactRef::generate()).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_evict_removes_file() {
        let temp_dir = tempdir().unwrap();
        let store = FilesystemArtifactStore::new(temp_dir.path().to_path_buf(), Duration::from_secs(60));
        let reference = store.save(Bytes::from_static(b"data")).await.unwrap();

        store.evict(&reference).await.unwrap();
        assert!(!temp_dir.path().join(reference.as_str()).exists());
        store.evict(&reference).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_files_are_purged() {
        let temp_dir = tempdir().unwrap();
        let store = FilesystemArtifactStore::new(temp_dir.path().to_path_buf(), Duration::from_secs(1));
        let reference = store.save(Bytes::from_static(b"data")).await.unwrap();

        // Unrelated files are left alone
        std::fs::write(temp_dir.path().join("notes.txt"), b"keep").unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(matches!(
            store.open(&reference).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(temp_dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_purge_missing_dir_is_noop() {
        let temp_dir = tempdir().unwrap();
        let store = FilesystemArtifactStore::new(temp_dir.path().join("never-created"), Duration::from_secs(1));
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }
}
