//! # QuickQuery Core
//!
//! Shared building blocks for the QuickQuery three-tier lookup cache.
//!
//! Every other crate in the workspace depends on this one:
//!
//! - **Types**: cache entries, origin tiers, resolution results
//! - **Errors**: the error taxonomy surfaced to callers
//! - **Constants**: default windows, capacity, and timeouts
//! - **Traits**: the durable store, remote fetcher, and clock seams
//!
//! ## Example
//!
//! ```rust
//! use quickquery_core::{normalize_key, Origin};
//!
//! assert_eq!(normalize_key("  France ").unwrap(), "france");
//! assert_eq!(Origin::Durable.to_string(), "durable");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod clock;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use constants::*;
pub use error::{QuickQueryError, Result};
pub use traits::*;
pub use types::*;
