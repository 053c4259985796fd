//! Scheduled Jobs
//!
//! Background jobs for periodic maintenance of the scene cache: device
//! status reconciliation and eviction of expired device lookup entries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::interval;

use crate::cache::{CacheError, SceneCache};

// =========================================================================
// Device Status Reconciliation Job
// =========================================================================

/// Recompute the derived status of every live device and persist the
/// corrections. Catches records left stale by a failed write.
pub async fn reconcile_device_status(cache: &SceneCache) -> Result<usize, JobError> {
    let corrected = cache.reconcile_devices().await?;

    if corrected > 0 {
        tracing::warn!(corrected = corrected, "Reconciled stale device statuses");
    }

    Ok(corrected)
}

// =========================================================================
// Device Lookup Sweep Job
// =========================================================================

/// Drop expired entries from the device lookup cache
pub fn sweep_device_lookup(cache: &SceneCache) -> usize {
    let swept = cache.sweep_device_lookup();

    if swept > 0 {
        tracing::debug!(swept = swept, "Swept expired device lookup entries");
    }

    swept
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Shortest period a job runs at; `interval` rejects zero
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for device status reconciliation (default: 5 minutes)
    pub reconcile_interval: Duration,
    /// Interval for the device lookup sweep (default: 1 minute)
    pub sweep_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    cache: Arc<SceneCache>,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(cache: Arc<SceneCache>) -> Self {
        Self {
            cache,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(cache: Arc<SceneCache>, config: JobSchedulerConfig) -> Self {
        Self { cache, config }
    }

    /// Start the job scheduler in the background.
    /// Returns a handle that can be used to abort the scheduler.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        tracing::info!(
            reconcile_secs = self.config.reconcile_interval.as_secs(),
            sweep_secs = self.config.sweep_interval.as_secs(),
            "Job scheduler started"
        );

        let mut reconcile_interval = interval(self.config.reconcile_interval.max(MIN_INTERVAL));
        let mut sweep_interval = interval(self.config.sweep_interval.max(MIN_INTERVAL));

        loop {
            tokio::select! {
                _ = reconcile_interval.tick() => {
                    if let Err(e) = reconcile_device_status(&self.cache).await {
                        tracing::error!(error = %e, "Device status reconciliation failed");
                    }
                }
                _ = sweep_interval.tick() => {
                    sweep_device_lookup(&self.cache);
                }
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match reconcile_device_status(&self.cache).await {
            Ok(count) => report.devices_reconciled = count,
            Err(e) => report.errors.push(format!("Device reconciliation: {}", e)),
        }

        report.lookup_entries_swept = sweep_device_lookup(&self.cache);
        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub devices_reconciled: usize,
    pub lookup_entries_swept: usize,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

// =========================================================================
// Tests
// =========================================================================
