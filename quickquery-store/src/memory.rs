//! In-memory response store.
//!
//! Same contract as the SQLite store, nothing written to disk. Useful for
//! tests and for sessions that should leave no trace.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

use quickquery_core::clock::Clock;
use quickquery_core::error::Result;
use quickquery_core::traits::DurableStore;
use quickquery_core::types::{expiry_cutoff, CacheEntry};

use crate::config::StoreConfig;

/// Concurrent-map backed store.
///
/// Per-key operations are atomic through the map's shard locks.
pub struct MemoryStore {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
}

impl MemoryStore {
    /// Creates an empty store with default configuration.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(StoreConfig::default(), clock)
    }

    /// Creates an empty store with custom configuration.
    pub fn with_config(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            config,
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    fn purge_before(&self, cutoff_ms: i64) -> u64 {
        let mut removed = 0u64;
        self.entries.retain(|_, entry| {
            if entry.stored_at < cutoff_ms {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    #[instrument(skip(self))]
    async fn get_if_fresh(&self, key: &str, freshness_window_ms: i64) -> Result<Option<CacheEntry>> {
        let now = self.clock.now_ms();

        let purged = self.purge_before(expiry_cutoff(now, self.config.retention_window_ms));
        if purged > 0 {
            debug!(purged, "Purged expired entries before read");
        }

        Ok(self
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, freshness_window_ms))
            .map(|entry| entry.value().clone()))
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        self.entries.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn delete_older_than(&self, cutoff_ms: i64) -> Result<u64> {
        Ok(self.purge_before(cutoff_ms))
    }

    async fn get_all(&self) -> Result<Vec<CacheEntry>> {
        Ok(self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entries.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickquery_core::clock::ManualClock;

    const FRESH: i64 = 10 * 60 * 1000;
    const RETAIN: i64 = 30 * 60 * 1000;
    const T0: i64 = 1_700_000_000_000;

    fn make_store() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        (MemoryStore::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (store, _) = make_store();
        store.put(CacheEntry::new("france", "[1]", T0)).await.unwrap();

        let got = store.get("france").await.unwrap().unwrap();
        assert_eq!(got.payload, "[1]");
        assert!(store.get("spain").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_on_conflict() {
        let (store, _) = make_store();
        store.put(CacheEntry::new("france", "old", T0)).await.unwrap();
        store.put(CacheEntry::new("france", "new", T0 + 1)).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let got = store.get("france").await.unwrap().unwrap();
        assert_eq!(got, CacheEntry::new("france", "new", T0 + 1));
    }

    #[tokio::test]
    async fn test_get_if_fresh_boundary() {
        let (store, _) = make_store();
        store.put(CacheEntry::new("stale", "x", T0 - FRESH - 1)).await.unwrap();
        store.put(CacheEntry::new("fresh", "x", T0 - FRESH + 1)).await.unwrap();

        assert!(store.get_if_fresh("stale", FRESH).await.unwrap().is_none());
        assert!(store.get_if_fresh("fresh", FRESH).await.unwrap().is_some());

        // Stale but retained: still physically present
        assert!(store.get("stale").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_if_fresh_purges_expired() {
        let (store, _) = make_store();
        store.put(CacheEntry::new("ancient", "x", T0 - RETAIN)).await.unwrap();
        store.put(CacheEntry::new("recent", "x", T0)).await.unwrap();

        // Reading an unrelated key still triggers the purge
        assert!(store.get_if_fresh("other", FRESH).await.unwrap().is_none());

        assert!(store.get("ancient").await.unwrap().is_none());
        assert!(store.get("recent").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let (store, _) = make_store();
        store.put(CacheEntry::new("a", "1", T0 - 10)).await.unwrap();
        store.put(CacheEntry::new("b", "2", T0 - 5)).await.unwrap();
        store.put(CacheEntry::new("c", "3", T0)).await.unwrap();

        assert_eq!(store.delete_older_than(T0 - 5).await.unwrap(), 1);
        assert_eq!(store.delete_older_than(T0 - 5).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_all() {
        let (store, _) = make_store();
        store.put(CacheEntry::new("a", "1", T0)).await.unwrap();
        store.put(CacheEntry::new("b", "2", T0)).await.unwrap();

        let mut all = store.get_all().await.unwrap();
        all.sort_by(|x, y| x.key.cmp(&y.key));
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].key, "a");
        assert_eq!(all[1].key, "b");

        store.clear();
        assert!(store.is_empty());
    }
}
