//! Bounded recency cache for QuickQuery.
//!
//! Fixed-capacity in-memory tier with least-recently-used eviction and
//! lazy expiry on read.

mod cache;

pub use cache::{CacheConfig, CacheStats, RecencyCache};
