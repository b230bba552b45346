//! In-memory LRU tier.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use quickquery_core::clock::Clock;
use quickquery_core::constants::DEFAULT_CACHE_CAPACITY;
use quickquery_core::error::{QuickQueryError, Result};
use quickquery_core::types::CacheEntry;

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Creates a config with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Checks the capacity is usable.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(QuickQueryError::ConfigError(
                "cache capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Fixed-capacity recency cache.
///
/// Thread-safe. Every operation, reads included, takes one short mutex
/// section: an LRU lookup reorders the recency list, so a `get` is a write
/// as far as the structure is concerned. None of the operations can fail;
/// a lookup that cannot be served is a miss.
pub struct RecencyCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl RecencyCache {
    /// Creates a cache with default configuration.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(CacheConfig::default(), clock)
    }

    /// Creates a cache with custom configuration.
    ///
    /// A zero capacity is raised to one; call [`CacheConfig::validate`] first
    /// to reject it instead.
    pub fn with_config(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Stores `payload` under `key`, stamped with the current time.
    ///
    /// Replaces any existing entry for the key. If the cache is full, the
    /// least recently used entry is evicted to make room.
    pub fn put(&self, key: &str, payload: &str) {
        let entry = CacheEntry::new(key, payload, self.clock.now_ms());

        let displaced = self.entries.lock().push(key.to_string(), entry);

        if let Some((old_key, _)) = displaced {
            if old_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key, evicted = %old_key, "Evicted least recently used entry");
            }
        }
    }

    /// Returns the payload if present and `now - stored_at < freshness_window_ms`.
    ///
    /// A hit marks the key as most recently used. A stale entry is removed
    /// on the spot.
    pub fn get(&self, key: &str, freshness_window_ms: i64) -> Option<String> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();

        let lookup = entries
            .get(key)
            .map(|e| (e.is_fresh(now, freshness_window_ms), e.payload.clone()));

        match lookup {
            Some((true, payload)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(payload)
            }
            Some((false, _)) => {
                entries.pop(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Memory entry stale, dropped");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Point-in-time copy of every entry, most recently used first.
    ///
    /// Does not touch recency order.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        self.entries
            .lock()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Removes all entries with `stored_at < cutoff_ms`, returning how many went.
    pub fn remove_older_than(&self, cutoff_ms: i64) -> usize {
        let mut entries = self.entries.lock();

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.stored_at < cutoff_ms)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }

        expired.len()
    }

    /// Removes a single entry.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            entries: entries.len(),
            capacity: entries.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries currently held
    pub entries: usize,
    /// Maximum capacity
    pub capacity: usize,
    /// Fresh lookups served
    pub hits: u64,
    /// Lookups that found nothing or something stale
    pub misses: u64,
    /// Entries dropped for capacity
    pub evictions: u64,
}
