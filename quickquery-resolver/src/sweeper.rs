//! Periodic expiry sweep.
//!
//! Physically deletes entries past the retention window from both cached
//! tiers. Runs once at startup and then on a fixed interval as a background
//! task. Sweeps never overlap: a sweep requested while another is running is
//! skipped, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

use quickquery_cache::RecencyCache;
use quickquery_core::clock::Clock;
use quickquery_core::constants::{DEFAULT_RETENTION_WINDOW_MS, DEFAULT_SWEEP_INTERVAL_SECS};
use quickquery_core::error::{QuickQueryError, Result};
use quickquery_core::traits::DurableStore;
use quickquery_core::types::expiry_cutoff;

/// Configuration for the expiry sweeper.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between sweeps
    pub interval_seconds: u64,
    /// Entries with `now - stored_at >= retention_window_ms` are deleted
    pub retention_window_ms: i64,
    /// Whether the background task runs at all
    pub enabled: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_SWEEP_INTERVAL_SECS,
            retention_window_ms: DEFAULT_RETENTION_WINDOW_MS,
            enabled: true,
        }
    }
}

impl SweeperConfig {
    /// Checks the interval and retention window are positive.
    pub fn validate(&self) -> Result<()> {
        if self.interval_seconds == 0 {
            return Err(QuickQueryError::ConfigError(
                "sweep interval must be at least one second".into(),
            ));
        }
        if self.retention_window_ms <= 0 {
            return Err(QuickQueryError::ConfigError(
                "retention window must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Entries stored before this instant were removed
    pub cutoff_ms: i64,
    /// Entries removed from the memory tier
    pub memory_removed: usize,
    /// Rows removed from the durable tier
    pub durable_removed: u64,
    /// True if another sweep was already running and this one did nothing
    pub skipped: bool,
}

impl SweepReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Total entries removed across both tiers.
    pub fn total_removed(&self) -> u64 {
        self.memory_removed as u64 + self.durable_removed
    }
}

/// Clears the in-progress flag when a sweep ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Background deleter of expired entries.
pub struct ExpirySweeper {
    memory: Arc<RecencyCache>,
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    config: SweeperConfig,
    running: AtomicBool,
    last_sweep_at: RwLock<Option<i64>>,
}

impl ExpirySweeper {
    /// Creates a sweeper over the given tiers.
    pub fn new(
        memory: Arc<RecencyCache>,
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            memory,
            store,
            clock,
            config,
            running: AtomicBool::new(false),
            last_sweep_at: RwLock::new(None),
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Time of the last completed sweep, if any.
    pub fn last_sweep_at(&self) -> Option<i64> {
        *self.last_sweep_at.read()
    }

    /// Runs one sweep now.
    ///
    /// Memory goes first, then the durable tier. If the durable delete fails
    /// the memory purge still stands and the error is returned; the next
    /// sweep retries.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<SweepReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sweep already in progress, skipping");
            return Ok(SweepReport::skipped());
        }
        let _guard = RunningGuard(&self.running);

        let now = self.clock.now_ms();
        let cutoff_ms = expiry_cutoff(now, self.config.retention_window_ms);

        let memory_removed = self.memory.remove_older_than(cutoff_ms);

        let durable_removed = match self.store.delete_older_than(cutoff_ms).await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, memory_removed, "Durable sweep failed");
                return Err(e);
            }
        };

        *self.last_sweep_at.write() = Some(now);

        let report = SweepReport {
            cutoff_ms,
            memory_removed,
            durable_removed,
            skipped: false,
        };
        info!(
            memory_removed,
            durable_removed, "Expiry sweep completed"
        );
        Ok(report)
    }

    /// Spawns the periodic sweep task.
    ///
    /// The first sweep runs immediately. Returns `None` when disabled.
    pub fn spawn(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            info!("Expiry sweeper is disabled, skipping");
            return None;
        }
        Some(tokio::spawn(async move { self.run().await }))
    }

    async fn run(&self) {
        let period = Duration::from_secs(self.config.interval_seconds.max(1));
        info!(
            interval_seconds = period.as_secs(),
            "Starting expiry sweeper"
        );

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            // Failures are logged inside sweep; keep ticking
            let _ = self.sweep().await;
        }
    }
}
