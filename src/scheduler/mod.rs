//! Scheduler module for running probe cycles and normalizing the history.

use crate::config::ServerConfig;
use crate::history::{
    align_up_to_next_five_minutes, normalize_with, record_samples, HistoryStore, Sample,
};
use crate::probe::check_target;
use crate::store::{HistoryFile, StoreError};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

/// Maximum number of probes in flight at once.
const MAX_CONCURRENT_PROBES: usize = 5;

/// Cycle length, matching the fine-grained sample slots.
const CYCLE_INTERVAL: Duration = Duration::from_secs(300);

/// The scheduler that owns the read-probe-normalize-write cycle.
pub struct Scheduler {
    config: ServerConfig,
    file: HistoryFile,
    // Serializes cycles so only one read-transform-write runs at a time.
    cycle: Mutex<()>,
}

impl Scheduler {
    /// Create a new scheduler writing to the given history file.
    pub fn new(config: ServerConfig, file: HistoryFile) -> Self {
        Self {
            config,
            file,
            cycle: Mutex::new(()),
        }
    }

    /// Probe every configured target concurrently.
    ///
    /// Targets whose probe could not run are absent from the result.
    pub async fn collect_samples(&self) -> Vec<Sample> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_PROBES));
        let timeout = self.config.probe_timeout;

        let handles: Vec<_> = self
            .config
            .targets
            .iter()
            .cloned()
            .map(|target| {
                let semaphore = semaphore.clone();
                tokio::spawn(async move {
                    // Fails only once the semaphore is closed, which never happens here
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    check_target(&target, timeout).await
                })
            })
            .collect();

        let mut samples = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Some(sample)) => samples.push(sample),
                Ok(None) => {}
                Err(e) => tracing::error!("Scheduler: probe task failed: {}", e),
            }
        }
        samples
    }

    /// Merge samples into the stored history, normalize it and write it back.
    pub async fn apply_samples(
        &self,
        samples: &[Sample],
        now: DateTime<Utc>,
    ) -> Result<HistoryStore, StoreError> {
        let _guard = self.cycle.lock().await;

        let existing = self.file.load()?;
        let combined = record_samples(&existing, samples, now);
        let normalized = normalize_with(&combined, now, &self.config.retention)?;
        self.file.save(&normalized)?;

        Ok(normalized)
    }

    /// Run one full cycle: probe, then record at `now`.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<HistoryStore, StoreError> {
        tracing::info!("Scheduler: starting cycle for {} targets", self.config.targets.len());

        let samples = self.collect_samples().await;
        let store = self.apply_samples(&samples, now).await?;

        tracing::info!(
            "Scheduler: cycle complete, {} samples recorded, {} targets in {}",
            samples.len(),
            store.len(),
            self.file.path().display()
        );
        Ok(store)
    }

    /// Run a cycle every five minutes, on the slot boundaries, until Ctrl-C.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("Starting scheduler with {} targets", self.config.targets.len());

        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = tokio::time::sleep(until_next_slot(Utc::now())) => {}
        }

        let mut interval = tokio::time::interval(CYCLE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Scheduler: shutting down");
                    return Ok(());
                }
                _ = interval.tick() => {
                    if let Err(e) = self.run_cycle(Utc::now()).await {
                        tracing::error!("Scheduler: cycle failed: {}", e);
                    }
                }
            }
        }
    }
}

/// Time left until the next 5-minute boundary.
fn until_next_slot(now: DateTime<Utc>) -> Duration {
    let next = align_up_to_next_five_minutes(now).as_datetime();
    (next - now).to_std().unwrap_or_default()
}
