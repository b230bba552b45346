//! SQLite-backed response store.
//!
//! A single `responses` table in a local libSQL database:
//!
//! ```text
//! responses(key TEXT PRIMARY KEY, payload TEXT NOT NULL, stored_at INTEGER NOT NULL)
//! ```
//!
//! Writes are `INSERT OR REPLACE`, so a late write from an abandoned lookup
//! overwrites rather than duplicates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use libsql::params::IntoParams;
use libsql::{params, Builder, Connection, Database};
use tracing::{debug, info, instrument};

use quickquery_core::clock::Clock;
use quickquery_core::error::{QuickQueryError, Result};
use quickquery_core::traits::DurableStore;
use quickquery_core::types::{expiry_cutoff, CacheEntry};

use crate::config::StoreConfig;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS responses (
    key       TEXT PRIMARY KEY,
    payload   TEXT NOT NULL,
    stored_at INTEGER NOT NULL
)";

const STORED_AT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_responses_stored_at ON responses (stored_at)";

fn storage_err(e: libsql::Error) -> QuickQueryError {
    QuickQueryError::StorageFailure(e.to_string())
}

fn path_display(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ":memory:".into())
}

/// Durable store on a local libSQL database.
pub struct SqliteStore {
    // Kept alive for the lifetime of the connection
    _db: Database,
    conn: Connection,
    path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path`.
    #[instrument(skip_all)]
    pub async fn open(
        path: impl AsRef<Path>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                QuickQueryError::StorageFailure(format!(
                    "failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let db = Builder::new_local(&path).build().await.map_err(storage_err)?;
        let store = Self::init(db, Some(path), config, clock).await?;
        info!(path = %path_display(&store.path), "Opened durable store");
        Ok(store)
    }

    /// Opens a private in-memory database. Contents vanish on drop.
    pub async fn in_memory(config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(storage_err)?;
        Self::init(db, None, config, clock).await
    }

    async fn init(
        db: Database,
        path: Option<PathBuf>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let conn = db.connect().map_err(storage_err)?;
        conn.execute(SCHEMA, ()).await.map_err(storage_err)?;
        conn.execute(STORED_AT_INDEX, ()).await.map_err(storage_err)?;

        Ok(Self {
            _db: db,
            conn,
            path,
            clock,
            config,
        })
    }

    /// Returns the database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn select(&self, sql: &str, args: impl IntoParams) -> Result<Vec<CacheEntry>> {
        let mut rows = self.conn.query(sql, args).await.map_err(storage_err)?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            entries.push(CacheEntry {
                key: row.get::<String>(0).map_err(storage_err)?,
                payload: row.get::<String>(1).map_err(storage_err)?,
                stored_at: row.get::<i64>(2).map_err(storage_err)?,
            });
        }
        Ok(entries)
    }
}

#[async_trait]
impl DurableStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut found = self
            .select(
                "SELECT key, payload, stored_at FROM responses WHERE key = ?1",
                params![key.to_string()],
            )
            .await?;
        Ok(found.pop())
    }

    #[instrument(skip(self))]
    async fn get_if_fresh(&self, key: &str, freshness_window_ms: i64) -> Result<Option<CacheEntry>> {
        let now = self.clock.now_ms();

        let purged = self
            .delete_older_than(expiry_cutoff(now, self.config.retention_window_ms))
            .await?;
        if purged > 0 {
            debug!(purged, "Purged expired rows before read");
        }

        // `stored_at > now - window` is CacheEntry::is_fresh moved into SQL
        let mut found = self
            .select(
                "SELECT key, payload, stored_at FROM responses WHERE key = ?1 AND stored_at > ?2",
                params![key.to_string(), now - freshness_window_ms],
            )
            .await?;
        Ok(found.pop())
    }

    #[instrument(skip(self, entry), fields(key = %entry.key))]
    async fn put(&self, entry: CacheEntry) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO responses (key, payload, stored_at) VALUES (?1, ?2, ?3)",
                params![entry.key, entry.payload, entry.stored_at],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_older_than(&self, cutoff_ms: i64) -> Result<u64> {
        self.conn
            .execute(
                "DELETE FROM responses WHERE stored_at < ?1",
                params![cutoff_ms],
            )
            .await
            .map_err(storage_err)
    }

    async fn get_all(&self) -> Result<Vec<CacheEntry>> {
        self.select(
            "SELECT key, payload, stored_at FROM responses ORDER BY stored_at DESC",
            (),
        )
        .await
    }

    async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM responses", ())
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(storage_err)?.max(0) as u64),
            None => Ok(0),
        }
    }
}
