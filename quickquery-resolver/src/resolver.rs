//! Three-tier resolution policy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use quickquery_cache::RecencyCache;
use quickquery_core::clock::Clock;
use quickquery_core::constants::{DEFAULT_FRESHNESS_WINDOW_MS, DEFAULT_RETENTION_WINDOW_MS};
use quickquery_core::error::{QuickQueryError, Result};
use quickquery_core::traits::{DurableStore, RemoteFetcher};
use quickquery_core::types::{normalize_key, CacheEntry, Origin, Resolved};

/// Resolver configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum age (ms) of an entry served from memory or the durable tier
    pub freshness_window_ms: i64,
    /// Age (ms) at which entries are physically deleted; bounds the freshness window
    pub retention_window_ms: i64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            freshness_window_ms: DEFAULT_FRESHNESS_WINDOW_MS,
            retention_window_ms: DEFAULT_RETENTION_WINDOW_MS,
        }
    }
}

impl ResolverConfig {
    /// Overrides the freshness window.
    pub fn with_freshness_ms(mut self, freshness_window_ms: i64) -> Self {
        self.freshness_window_ms = freshness_window_ms;
        self
    }

    /// Overrides the retention window.
    pub fn with_retention_ms(mut self, retention_window_ms: i64) -> Self {
        self.retention_window_ms = retention_window_ms;
        self
    }

    /// Checks `0 < freshness <= retention`.
    pub fn validate(&self) -> Result<()> {
        if self.freshness_window_ms <= 0 {
            return Err(QuickQueryError::ConfigError(
                "freshness window must be positive".into(),
            ));
        }
        if self.freshness_window_ms > self.retention_window_ms {
            return Err(QuickQueryError::ConfigError(format!(
                "freshness window ({}ms) exceeds retention window ({}ms)",
                self.freshness_window_ms, self.retention_window_ms
            )));
        }
        Ok(())
    }
}

/// Resolves queries across memory, durable, and network tiers.
///
/// The resolver is the only writer into the memory and durable tiers.
/// Concurrent lookups for the same key are not deduplicated: both may reach
/// the network, and the later write wins.
pub struct CacheResolver {
    memory: Arc<RecencyCache>,
    store: Arc<dyn DurableStore>,
    fetcher: Arc<dyn RemoteFetcher>,
    clock: Arc<dyn Clock>,
    config: ResolverConfig,
}

impl CacheResolver {
    /// Creates a resolver with default windows.
    pub fn new(
        memory: Arc<RecencyCache>,
        store: Arc<dyn DurableStore>,
        fetcher: Arc<dyn RemoteFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_config(ResolverConfig::default(), memory, store, fetcher, clock)
    }

    /// Creates a resolver with custom configuration.
    pub fn with_config(
        config: ResolverConfig,
        memory: Arc<RecencyCache>,
        store: Arc<dyn DurableStore>,
        fetcher: Arc<dyn RemoteFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            memory,
            store,
            fetcher,
            clock,
            config,
        }
    }

    /// Resolves a query with no loading notification.
    pub async fn resolve(&self, query: &str) -> Result<Resolved> {
        self.resolve_with(query, || {}).await
    }

    /// Resolves a query.
    ///
    /// `on_fetch_starting` runs exactly once, right before the network call,
    /// and only if both cached tiers missed.
    ///
    /// # Errors
    ///
    /// Only the network tier's failures surface here (plus `InvalidQuery` for
    /// a blank query). A durable-tier read fault counts as a miss; a
    /// durable-tier write fault is logged and the fetched payload is still
    /// returned.
    #[instrument(skip(self, on_fetch_starting))]
    pub async fn resolve_with<F>(&self, query: &str, on_fetch_starting: F) -> Result<Resolved>
    where
        F: FnOnce() + Send,
    {
        let key = normalize_key(query)?;
        let window = self.config.freshness_window_ms;

        if let Some(payload) = self.memory.get(&key, window) {
            debug!(key, "Memory hit");
            return Ok(Resolved::new(key, payload, Origin::Memory));
        }

        match self.store.get_if_fresh(&key, window).await {
            Ok(Some(entry)) => {
                debug!(key, "Durable hit");
                self.memory.put(&key, &entry.payload);
                return Ok(Resolved::new(key, entry.payload, Origin::Durable));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key, error = %e, "Durable read failed, falling through to network");
            }
        }

        on_fetch_starting();
        debug!(key, "Cache miss, fetching from network");

        let payload = self.fetcher.fetch(&key).await?;
        self.write_back(&key, &payload).await;

        info!(key, "Resolved from network");
        Ok(Resolved::new(key, payload, Origin::Network))
    }

    /// Stores a network payload in the durable tier, then in memory.
    async fn write_back(&self, key: &str, payload: &str) {
        let entry = CacheEntry::new(key, payload, self.clock.now_ms());

        if let Err(e) = self.store.put(entry).await {
            warn!(key, error = %e, "Durable write failed, result not persisted");
        }
        self.memory.put(key, payload);
    }

    /// Memory tier contents, most recently used first.
    pub fn list_memory_entries(&self) -> Vec<CacheEntry> {
        self.memory.snapshot()
    }

    /// Durable tier contents, newest first.
    pub async fn list_durable_entries(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = self.store.get_all().await?;
        entries.sort_by(|a, b| b.stored_at.cmp(&a.stored_at).then_with(|| a.key.cmp(&b.key)));
        Ok(entries)
    }

    /// Empties the memory tier. The durable tier is untouched.
    pub fn clear_memory(&self) {
        self.memory.clear();
        info!("Memory tier cleared");
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Shared handle to the memory tier.
    pub fn memory(&self) -> &Arc<RecencyCache> {
        &self.memory
    }
}
