//! Expired-record reaper for periodic durable-store maintenance
//!
//! Expired records are already rejected by the verifier's own expiry check,
//! so a missed sweep only delays space reclamation. Failures are logged,
//! never propagated.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::repositories::record::r#trait::RecordStore;

/// Default number of records deleted per sweep batch
pub const DEFAULT_SWEEP_BATCH_SIZE: u32 = 500;

/// Configuration for the reaper
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// How often to run a sweep (in seconds)
    pub interval_seconds: u64,
    /// Maximum number of records to delete in one batch
    pub batch_size: u32,
    /// Whether to enable automatic sweeping
    pub enabled: bool,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600, // Run every hour
            batch_size: DEFAULT_SWEEP_BATCH_SIZE,
            enabled: true,
        }
    }
}

/// Result of one sweep cycle
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Number of expired records deleted
    pub deleted: u64,
    /// Any errors encountered during the sweep
    pub errors: Vec<String>,
}

impl SweepOutcome {
    /// Check whether the sweep completed without errors
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Delete expired records in batches until a batch comes back short
///
/// Batching bounds the duration of any single sweep; a batch smaller than
/// `batch_size` signals exhaustion.
pub async fn sweep_until_exhausted<R: RecordStore + ?Sized>(
    store: &R,
    batch_size: u32,
) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    loop {
        match store.sweep_expired(batch_size).await {
            Ok(deleted) => {
                outcome.deleted += deleted as u64;
                if deleted < batch_size {
                    break;
                }
            }
            Err(e) => {
                error!(error = %e, "expired-record sweep batch failed");
                outcome.errors.push(e.to_string());
                break;
            }
        }
    }

    outcome
}

/// Service sweeping expired OTP records out of the durable store
pub struct Reaper<R: RecordStore + 'static> {
    store: Arc<R>,
    config: ReaperConfig,
}

impl<R: RecordStore + 'static> Reaper<R> {
    /// Create a new reaper
    pub fn new(store: Arc<R>, config: ReaperConfig) -> Self {
        Self { store, config }
    }

    /// Run a single sweep cycle
    pub async fn run_sweep(&self) -> SweepOutcome {
        if !self.config.enabled {
            return SweepOutcome::default();
        }

        let outcome = sweep_until_exhausted(self.store.as_ref(), self.config.batch_size).await;

        info!(
            deleted = outcome.deleted,
            event = "reaper_sweep_completed",
            "expired-record sweep finished"
        );

        outcome
    }

    /// Start the reaper as a background task
    ///
    /// Spawns a tokio task that sweeps at the configured interval.
    pub fn start_background_task(self: Arc<Self>) {
        if !self.config.enabled {
            warn!("expired-record reaper is disabled");
            return;
        }

        let interval = std::time::Duration::from_secs(self.config.interval_seconds);

        tokio::spawn(async move {
            info!(
                interval_seconds = self.config.interval_seconds,
                "expired-record reaper started"
            );

            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;

                let outcome = self.run_sweep().await;
                if !outcome.is_success() {
                    warn!(errors = ?outcome.errors, "sweep completed with errors");
                }
            }
        });
    }
}
