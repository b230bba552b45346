//! Origin tiers and resolution results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The tier that answered a lookup, fastest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Bounded in-process recency cache
    Memory,
    /// Persistent store, survives restarts
    Durable,
    /// Remote API
    Network,
}

impl Origin {
    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Memory => "memory",
            Origin::Durable => "durable",
            Origin::Network => "network",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload tagged with the tier it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolved {
    /// Normalized key the lookup ran under
    pub key: String,
    /// Serialized response body
    pub payload: String,
    /// Tier that produced the payload
    pub origin: Origin,
}

impl Resolved {
    /// Creates a resolution result.
    pub fn new(key: impl Into<String>, payload: impl Into<String>, origin: Origin) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
            origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_display() {
        assert_eq!(Origin::Memory.to_string(), "memory");
        assert_eq!(Origin::Durable.to_string(), "durable");
        assert_eq!(Origin::Network.to_string(), "network");
    }

    #[test]
    fn test_origin_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Origin::Durable).unwrap(), "\"durable\"");
        let parsed: Origin = serde_json::from_str("\"network\"").unwrap();
        assert_eq!(parsed, Origin::Network);
    }

    #[test]
    fn test_origin_ordering_is_tier_order() {
        assert!(Origin::Memory < Origin::Durable);
        assert!(Origin::Durable < Origin::Network);
    }
}
