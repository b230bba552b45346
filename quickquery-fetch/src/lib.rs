//! HTTP client for the QuickQuery network tier.
//!
//! Talks to the REST Countries `v3.1/name/{name}` endpoint with fixed
//! connect/read timeouts and no internal retries.

mod http;

pub use http::{FetchConfig, HttpFetcher};

// Re-export the trait from core
pub use quickquery_core::traits::RemoteFetcher;
