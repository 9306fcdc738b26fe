use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::time::Duration;
use tracing::debug;

use super::{ArtifactRef, ArtifactStore, StorageError, StorageResult};

/// In-memory artifact store backed by a moka cache.
///
/// Entries expire `ttl` after insertion. The cache is weighted by payload
/// size, so `max_bytes` bounds total memory. LRU eviction admits every new
/// entry and drops the least recently used ones under pressure.
pub struct MemoryArtifactStore {
    cache: Cache<ArtifactRef, Bytes>,
    max_bytes: u64,
}

impl MemoryArtifactStore {
    pub fn new(ttl: Duration, max_bytes: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_bytes)
            .weigher(|_key: &ArtifactRef, value: &Bytes| -> u32 {
                value.len().try_into().unwrap_or(u32::MAX)
            })
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { cache, max_bytes }
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn save(&self, payload: Bytes) -> StorageResult<ArtifactRef> {
        if payload.is_empty() {
            return Err(StorageError::EmptyPayload);
        }
        // A payload heavier than the whole budget would be evicted on insert
        if payload.len() as u64 > self.max_bytes {
            return Err(StorageError::CapacityExceeded {
                size: payload.len(),
                capacity: self.max_bytes,
            });
        }

        let reference = ArtifactRef::generate();
        let size = payload.len();
        self.cache.insert(reference.clone(), payload).await;

        // A reference is only handed out once the cache has admitted it
        self.cache.run_pending_tasks().await;
        if !self.cache.contains_key(&reference) {
            return Err(StorageError::CapacityExceeded {
                size,
                capacity: self.max_bytes,
            });
        }
        debug!(reference = %reference, bytes = size, "Stored artifact in memory");
        Ok(reference)
    }

    async fn open(&self, reference: &ArtifactRef) -> StorageResult<Bytes> {
        self.cache
            .get(reference)
            .await
            .ok_or_else(|| StorageError::NotFound(reference.to_string()))
    }

    async fn evict(&self, reference: &ArtifactRef) -> StorageResult<()> {
        self.cache.invalidate(reference).await;
        Ok(())
    }

    async fn purge_expired(&self) -> StorageResult<usize> {
        let before = self.cache.entry_count();
        self.cache.run_pending_tasks().await;
        let after = self.cache.entry_count();
        Ok(before.saturating_sub(after) as usize)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_open() {
        let store = MemoryArtifactStore::new(Duration::from_secs(60), 1024);
        let reference = store.save(Bytes::from_static(b"mp3 bytes")).await.unwrap();
        assert_eq!(&store.open(&reference).await.unwrap()[..], b"mp3 bytes");
    }

    #[tokio::test]
    async fn test_identical_payloads_get_distinct_references() {
        let store = MemoryArtifactStore::new(Duration::from_secs(60), 1024);
        let a = store.save(Bytes::from_static(b"same")).await.unwrap();
        let b = store.save(Bytes::from_static(b"same")).await.unwrap();
        assert_ne!(a, b);
        assert!(store.open(&a).await.is_ok());
        assert!(store.open(&b).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_reference_not_found() {
        let store = MemoryArtifactStore::new(Duration::from_secs(60), 1024);
        let err = store.open(&ArtifactRef::generate()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_evict() {
        let store = MemoryArtifactStore::new(Duration::from_secs(60), 1024);
        let reference = store.save(Bytes::from_static(b"gone")).await.unwrap();
        store.evict(&reference).await.unwrap();
        assert!(store.open(&reference).await.is_err());
        // Evicting twice is fine
        store.evict(&reference).await.unwrap();
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = MemoryArtifactStore::new(Duration::from_millis(50), 1024);
        let reference = store.save(Bytes::from_static(b"short lived")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(matches!(
            store.open(&reference).await,
            Err(StorageError::NotFound(_))
        ));
        store.purge_expired().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized() {
        let store = MemoryArtifactStore::new(Duration::from_secs(60), 4);
        assert!(matches!(
            store.save(Bytes::new()).await,
            Err(StorageError::EmptyPayload)
        ));
        assert!(matches!(
            store.save(Bytes::from_static(b"too large")).await,
            Err(StorageError::CapacityExceeded { size: 9, capacity: 4 })
        ));
    }

    #[tokio::test]
    async fn test_new_entries_readable_when_budget_is_full() {
        let store = MemoryArtifactStore::new(Duration::from_secs(600), 1000);
        let payload = Bytes::from(vec![7u8; 100]);

        let mut existing = Vec::new();
        for _ in 0..10 {
            existing.push(store.save(payload.clone()).await.unwrap());
        }
        // Make the existing entries popular
        for _ in 0..5 {
            for reference in &existing {
                let _ = store.open(reference).await;
            }
            store.cache.run_pending_tasks().await;
        }

        for _ in 0..20 {
            let reference = store.save(payload.clone()).await.unwrap();
            store.cache.run_pending_tasks().await;
            assert_eq!(store.open(&reference).await.unwrap(), payload);
        }
        assert!(store.cache.weighted_size() <= 1000);
    }
}
