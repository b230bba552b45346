//! # QuickQuery Resolver
//!
//! Decides which tier answers a query and keeps the faster tiers filled.
//!
//! Lookups go memory → durable → network and stop at the first hit. A hit
//! from a slower tier is written back into every faster one. The
//! [`ExpirySweeper`] runs beside the resolver and physically removes entries
//! past the retention window from both cached tiers.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quickquery_cache::RecencyCache;
//! use quickquery_core::SystemClock;
//! use quickquery_fetch::HttpFetcher;
//! use quickquery_resolver::{CacheResolver, ExpirySweeper, SweeperConfig};
//! use quickquery_store::{SqliteStore, StoreConfig};
//!
//! let clock = Arc::new(SystemClock);
//! let memory = Arc::new(RecencyCache::new(clock.clone()));
//! let store = Arc::new(SqliteStore::open("quickquery.db", StoreConfig::default(), clock.clone()).await?);
//! let fetcher = Arc::new(HttpFetcher::new()?);
//!
//! let resolver = CacheResolver::new(memory.clone(), store.clone(), fetcher, clock.clone());
//! let sweeper = Arc::new(ExpirySweeper::new(memory, store, clock, SweeperConfig::default()));
//! let _sweeps = sweeper.spawn();
//!
//! let resolved = resolver.resolve_with("France", || println!("loading...")).await?;
//! println!("{} from {}", resolved.payload, resolved.origin);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod resolver;
mod sweeper;

pub use resolver::{CacheResolver, ResolverConfig};
pub use sweeper::{ExpirySweeper, SweepReport, SweeperConfig};
