//! Seams between the resolution policy and its collaborators.
//!
//! The resolver owns one handle of each, passed in at construction, so tests
//! can swap the SQLite store or the HTTP client for in-process doubles.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::CacheEntry;

// ═══════════════════════════════════════════════════════════════════════════════
// DURABLE STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for the persistent tier.
///
/// Logically a single table `responses(key PRIMARY KEY, payload, stored_at)`.
/// Implementations only need per-key atomicity; nothing here spans keys.
///
/// Implementations might use:
/// - SQLite/libSQL (production)
/// - A concurrent map (testing/development)
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Returns the entry stored under `key`, fresh or not.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Returns the entry only if `stored_at > now - freshness_window_ms`.
    ///
    /// Before looking, deletes every entry older than the store's retention
    /// window. The read is the sweep's trigger, not its subject: the purge
    /// covers the whole table.
    async fn get_if_fresh(&self, key: &str, freshness_window_ms: i64) -> Result<Option<CacheEntry>>;

    /// Inserts or replaces the entry under its key.
    async fn put(&self, entry: CacheEntry) -> Result<()>;

    /// Deletes every entry with `stored_at < cutoff_ms`, returning how many went.
    async fn delete_older_than(&self, cutoff_ms: i64) -> Result<u64>;

    /// Every stored entry, for diagnostics.
    async fn get_all(&self) -> Result<Vec<CacheEntry>>;

    /// Number of stored entries.
    async fn count(&self) -> Result<u64>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// REMOTE FETCHER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for the network tier.
///
/// One call, one attempt: retry policy belongs to whoever calls `resolve`.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Fetches the records for a normalized key.
    ///
    /// Returns the serialized payload on success. Failures are classified as
    /// `Timeout`, `TransportFailure`, `EmptyResult`, or `FetchFailed`.
    async fn fetch(&self, key: &str) -> Result<String>;
}
