//! Error types for QuickQuery.
//!
//! Only network faults are meant to reach callers of `resolve`. Memory-tier
//! faults are absorbed as misses and durable-tier faults are logged and
//! bypassed; `StorageFailure` exists so the store adapters have something
//! precise to return before the resolver decides what to do with it.

use thiserror::Error;

/// Result type alias using `QuickQueryError`.
pub type Result<T> = std::result::Result<T, QuickQueryError>;

/// Main error type for all QuickQuery operations.
#[derive(Debug, Error)]
pub enum QuickQueryError {
    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The remote call did not complete within the configured timeout.
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Connection could not be established or broke mid-transfer.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The remote answered successfully but carried no records.
    #[error("No data received from the API")]
    EmptyResult,

    /// Non-success HTTP status or an otherwise unusable response.
    #[error("Network request failed: {0}")]
    FetchFailed(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Durable tier I/O error.
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Query normalizes to nothing usable.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl QuickQueryError {
    /// Returns true if the network tier gave up waiting.
    pub fn is_timeout(&self) -> bool {
        matches!(self, QuickQueryError::Timeout { .. })
    }

    /// Returns true if this error came from the network tier.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            QuickQueryError::Timeout { .. }
                | QuickQueryError::TransportFailure(_)
                | QuickQueryError::EmptyResult
                | QuickQueryError::FetchFailed(_)
        )
    }

    /// Returns true if this error is recoverable (the caller can retry).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            QuickQueryError::Timeout { .. } | QuickQueryError::TransportFailure(_)
        )
    }

    /// Message suitable for showing to an end user.
    ///
    /// Timeouts get their own wording so callers can tell them apart from
    /// other network failures.
    pub fn user_message(&self) -> String {
        match self {
            QuickQueryError::Timeout { .. } => "Read time out. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}
