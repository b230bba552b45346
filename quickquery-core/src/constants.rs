//! Default values shared across the tiers.
//!
//! All durations are expressed in the unit the components store them in:
//! windows in milliseconds (timestamps are epoch millis), network timeouts
//! and sweep intervals in seconds.

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE WINDOWS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum age for which a stored entry may be returned directly (10 minutes).
pub const DEFAULT_FRESHNESS_WINDOW_MS: i64 = 10 * 60 * 1000;

/// Age at which an entry is physically deleted from both tiers (30 minutes).
///
/// Must be at least as long as the freshness window: an entry can be stale
/// for reads yet still present until retention expiry.
pub const DEFAULT_RETENTION_WINDOW_MS: i64 = 30 * 60 * 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// MEMORY TIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum number of entries held by the in-memory tier.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

// ═══════════════════════════════════════════════════════════════════════════════
// NETWORK TIER
// ═══════════════════════════════════════════════════════════════════════════════

/// REST Countries API root.
pub const DEFAULT_BASE_URL: &str = "https://restcountries.com/";

/// Path prefix of the by-name lookup endpoint, relative to the base URL.
pub const NAME_ENDPOINT_PATH: &str = "v3.1/name";

/// TCP connect timeout for the remote fetcher.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout for the remote fetcher.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

// ═══════════════════════════════════════════════════════════════════════════════
// SWEEPER
// ═══════════════════════════════════════════════════════════════════════════════

/// Period between background expiry sweeps (30 minutes).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30 * 60;

// ═══════════════════════════════════════════════════════════════════════════════
// DURABLE TIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Default on-disk location of the durable tier.
pub const DEFAULT_DB_PATH: &str = "quickquery.db";
