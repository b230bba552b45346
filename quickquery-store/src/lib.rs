//! # QuickQuery Store
//!
//! The durable tier: one `responses` table keyed by normalized query.
//!
//! Two backends implement [`DurableStore`]:
//!
//! - **SQLite**: libSQL in local mode, a file on disk or `:memory:`
//! - **Memory**: a concurrent map for tests and throwaway sessions
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quickquery_core::{CacheEntry, SystemClock};
//! use quickquery_store::{SqliteStore, StoreConfig, DurableStore};
//!
//! let store = SqliteStore::open("quickquery.db", StoreConfig::default(), Arc::new(SystemClock)).await?;
//! store.put(CacheEntry::new("france", "[...]", now)).await?;
//! let hit = store.get_if_fresh("france", 10 * 60 * 1000).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod memory;
mod sqlite;

pub use config::StoreConfig;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

// Re-export the trait from core
pub use quickquery_core::traits::DurableStore;
