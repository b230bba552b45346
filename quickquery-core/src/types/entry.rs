//! Cache entries and query keys.

use serde::{Deserialize, Serialize};

use crate::error::{QuickQueryError, Result};

/// A cached response.
///
/// Entries are immutable once stored; a refresh is a full replacement
/// under the same key with a new `stored_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Normalized query (see [`normalize_key`])
    pub key: String,
    /// Serialized response body, opaque to the cache layer
    pub payload: String,
    /// Creation time, Unix epoch milliseconds
    pub stored_at: i64,
}

impl CacheEntry {
    /// Creates an entry stamped at `stored_at`.
    pub fn new(key: impl Into<String>, payload: impl Into<String>, stored_at: i64) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
            stored_at,
        }
    }

    /// Milliseconds elapsed since the entry was stored.
    #[inline]
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.stored_at
    }

    /// True while `now - stored_at < window`.
    #[inline]
    pub fn is_fresh(&self, now_ms: i64, freshness_window_ms: i64) -> bool {
        self.age_ms(now_ms) < freshness_window_ms
    }

    /// True once `now - stored_at >= retention`; such entries are due for deletion.
    #[inline]
    pub fn is_expired(&self, now_ms: i64, retention_window_ms: i64) -> bool {
        self.age_ms(now_ms) >= retention_window_ms
    }
}

/// Cutoff for the `stored_at < cutoff` purges that removes exactly the
/// entries [`CacheEntry::is_expired`] reports.
///
/// Every retention sweep, in every tier, derives its cutoff here.
#[inline]
pub fn expiry_cutoff(now_ms: i64, retention_window_ms: i64) -> i64 {
    now_ms - retention_window_ms + 1
}

/// Canonicalizes a user query into a cache key.
///
/// Trims, lower-cases, and collapses inner runs of whitespace, so
/// `"  United   States "` and `"united states"` share one entry in every tier.
pub fn normalize_key(query: &str) -> Result<String> {
    let key = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if key.is_empty() {
        return Err(QuickQueryError::InvalidQuery(
            "query cannot be empty".into(),
        ));
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("france", "france" ; "already canonical")]
    #[test_case("  France ", "france" ; "trim and lowercase")]
    #[test_case("United   States", "united states" ; "collapse whitespace")]
    #[test_case("\tCÔTE D'IVOIRE\n", "côte d'ivoire" ; "unicode")]
    fn test_normalize_key(input: &str, expected: &str) {
        assert_eq!(normalize_key(input).unwrap(), expected);
    }

    #[test]
    fn test_normalize_key_rejects_blank() {
        assert!(matches!(normalize_key(""), Err(QuickQueryError::InvalidQuery(_))));
        assert!(matches!(normalize_key("   \t"), Err(QuickQueryError::InvalidQuery(_))));
    }

    #[test]
    fn test_freshness_boundary() {
        let window = 10 * 60 * 1000;
        let now = 1_700_000_000_000;

        let stale = CacheEntry::new("france", "[]", now - window - 1);
        let exact = CacheEntry::new("france", "[]", now - window);
        let fresh = CacheEntry::new("france", "[]", now - window + 1);

        assert!(!stale.is_fresh(now, window));
        assert!(!exact.is_fresh(now, window));
        assert!(fresh.is_fresh(now, window));
    }

    #[test]
    fn test_retention_boundary() {
        let retention = 30 * 60 * 1000;
        let now = 1_700_000_000_000;

        assert!(CacheEntry::new("a", "x", now - retention).is_expired(now, retention));
        assert!(!CacheEntry::new("a", "x", now - retention + 1).is_expired(now, retention));
    }

    #[test]
    fn test_expiry_cutoff_at_retention_age() {
        let retention = 30 * 60 * 1000;
        let now = 1_700_000_000_000;
        let cutoff = expiry_cutoff(now, retention);

        // Exactly retention-old is purged, one millisecond younger is kept
        assert!(now - retention < cutoff);
        assert!(now - retention + 1 >= cutoff);
    }

    #[test]
    fn test_entry_serde() {
        let entry = CacheEntry::new("peru", r#"[{"cca2":"PE"}]"#, 1234);
        let json = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    proptest! {
        #[test]
        fn prop_expiry_cutoff_matches_is_expired(
            age in -1_000i64..10_000_000,
            retention in 1i64..5_000_000,
        ) {
            let now = 1_700_000_000_000i64;
            let entry = CacheEntry::new("k", "p", now - age);
            prop_assert_eq!(
                entry.stored_at < expiry_cutoff(now, retention),
                entry.is_expired(now, retention)
            );
        }

        #[test]
        fn prop_normalize_key_is_idempotent(query in "[ a-zA-Z\\t]{0,24}") {
            if let Ok(key) = normalize_key(&query) {
                prop_assert_eq!(normalize_key(&key).unwrap(), key.clone());
                prop_assert_eq!(key.trim(), key.as_str());
            }
        }
    }
}
