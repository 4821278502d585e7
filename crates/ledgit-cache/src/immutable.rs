use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use ledgit_types::ContentId;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::disk::DiskTier;

/// Stored content exactly as the ledger returned it.
///
/// Private content stays encrypted in the cache; decryption happens per read
/// with the reader's key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedBlob {
    pub data: String,
    pub name: String,
    pub mime: String,
    pub encrypted: bool,
}

/// Hit and miss counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
}

/// Read-through cache for immutable content.
///
/// Lookups go memory → disk → ledger. A disk hit is promoted into memory;
/// a ledger fetch populates both tiers. Content that the ledger reports as
/// not yet available is never cached.
pub struct ImmutableCache {
    memory: RwLock<HashMap<ContentId, Arc<CachedBlob>>>,
    disk: Option<DiskTier>,
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
}

impl ImmutableCache {
    /// In-process only.
    pub fn in_memory() -> Self {
        Self::with_disk(None)
    }

    pub fn with_disk(disk: Option<DiskTier>) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            disk,
            memory_hits: AtomicU64::new(0),
            disk_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, id: &ContentId) -> Option<Arc<CachedBlob>> {
        if let Some(blob) = self.memory.read().expect("lock poisoned").get(id) {
            self.memory_hits.fetch_add(1, Ordering::Relaxed);
            return Some(blob.clone());
        }
        let disk = self.disk.as_ref()?;
        match disk.read(id) {
            Ok(Some(blob)) => {
                self.disk_hits.fetch_add(1, Ordering::Relaxed);
                let blob = Arc::new(blob);
                self.memory
                    .write()
                    .expect("lock poisoned")
                    .insert(id.clone(), blob.clone());
                Some(blob)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(id = %id.short(), error = %e, "disk cache read failed");
                None
            }
        }
    }

    pub fn insert(&self, id: ContentId, blob: CachedBlob) -> Arc<CachedBlob> {
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.write(&id, &blob) {
                warn!(id = %id.short(), error = %e, "disk cache write failed");
            }
        }
        let blob = Arc::new(blob);
        self.memory
            .write()
            .expect("lock poisoned")
            .insert(id, blob.clone());
        blob
    }

    /// Return the cached entry, or fetch, cache and return it.
    ///
    /// `fetch` returning `Ok(None)` means "not yet available": nothing is
    /// cached and `Ok(None)` is returned.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        id: &ContentId,
        fetch: F,
    ) -> Result<Option<Arc<CachedBlob>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<CachedBlob>, E>>,
    {
        if let Some(hit) = self.get(id) {
            return Ok(Some(hit));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(fetch().await?.map(|blob| self.insert(id.clone(), blob)))
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.memory.read().expect("lock poisoned").contains_key(id)
    }

    /// Drop the in-process tier. The disk tier is kept.
    pub fn clear_memory(&self) {
        self.memory.write().expect("lock poisoned").clear();
    }

    pub fn disk(&self) -> Option<&DiskTier> {
        self.disk.as_ref()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ImmutableCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for ImmutableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImmutableCache")
            .field("entries", &self.memory.read().map(|m| m.len()).unwrap_or(0))
            .field("disk", &self.disk.as_ref().map(|d| d.dir().to_path_buf()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn blob(data: &str) -> CachedBlob {
        CachedBlob {
            data: data.to_string(),
            name: "tree.json".into(),
            mime: "application/json".into(),
            encrypted: false,
        }
    }

    #[tokio::test]
    async fn fetches_once_then_serves_from_memory() {
        let cache = ImmutableCache::in_memory();
        let id = ContentId::new("t1");
        let mut calls = 0;
        for _ in 0..3 {
            let got = cache
                .get_or_fetch(&id, || {
                    calls += 1;
                    async { Ok::<_, Infallible>(Some(blob("{}"))) }
                })
                .await
                .unwrap();
            assert_eq!(got.unwrap().data, "{}");
        }
        assert_eq!(calls, 1);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.memory_hits, 2);
    }

    #[tokio::test]
    async fn unavailable_content_is_not_cached() {
        let cache = ImmutableCache::in_memory();
        let id = ContentId::new("pending");
        let got = cache
            .get_or_fetch(&id, || async { Ok::<_, Infallible>(None) })
            .await
            .unwrap();
        assert!(got.is_none());
        assert!(!cache.contains(&id));
    }

    #[tokio::test]
    async fn fetch_errors_propagate() {
        let cache = ImmutableCache::in_memory();
        let id = ContentId::new("x");
        let got = cache
            .get_or_fetch(&id, || async { Err::<Option<CachedBlob>, _>("ledger down") })
            .await;
        assert_eq!(got.unwrap_err(), "ledger down");
    }

    #[test]
    fn disk_tier_survives_a_new_process_cache() {
        let dir = tempfile::tempdir().unwrap();
        let id = ContentId::new("file-1");
        {
            let cache = ImmutableCache::with_disk(Some(DiskTier::open(dir.path(), 4096).unwrap()));
            cache.insert(id.clone(), blob("hello"));
        }
        let cache = ImmutableCache::with_disk(Some(DiskTier::open(dir.path(), 4096).unwrap()));
        assert!(!cache.contains(&id));
        assert_eq!(cache.get(&id).unwrap().data, "hello");
        assert!(cache.contains(&id));
        assert_eq!(cache.stats().disk_hits, 1);
    }
}
