//! Store configuration.

use serde::{Deserialize, Serialize};

use quickquery_core::constants::DEFAULT_RETENTION_WINDOW_MS;

/// Settings shared by every durable backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Entries older than this are purged on every fresh-read
    pub retention_window_ms: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention_window_ms: DEFAULT_RETENTION_WINDOW_MS,
        }
    }
}

impl StoreConfig {
    /// Overrides the retention window.
    pub fn with_retention_ms(mut self, retention_window_ms: i64) -> Self {
        self.retention_window_ms = retention_window_ms;
        self
    }
}
