//! Domain types for QuickQuery.
//!
//! - [`CacheEntry`]: a stored response keyed by its normalized query
//! - [`Origin`]: which tier answered a lookup
//! - [`Resolved`]: a payload tagged with its origin

mod entry;
mod origin;

pub use entry::*;
pub use origin::*;
