//! Periodic reclamation of expired jobs and artifact files.
//!
//! The first sweep runs one interval after startup, then on every tick
//! until cancelled.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tunegrab_core::scheduler::Scheduler;

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(
    scheduler: Scheduler,
    expiry: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    let expiry = match chrono::Duration::from_std(expiry) {
        Ok(expiry) => expiry,
        Err(e) => {
            tracing::error!(error = %e, "Artifact sweep: expiry out of range, not starting");
            return;
        }
    };

    tracing::info!(
        expiry_secs = expiry.num_seconds(),
        interval_secs = interval.as_secs(),
        "Artifact sweep started"
    );

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Artifact sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                let report = scheduler.sweep(expiry, Utc::now()).await;
                if report.is_empty() {
                    tracing::debug!("Artifact sweep: nothing expired");
                } else {
                    tracing::info!(
                        jobs_removed = report.jobs_removed,
                        artifacts_deleted = report.artifacts_deleted,
                        files_deleted = report.files_deleted,
                        "Artifact sweep: reclaimed expired state"
                    );
                }
            }
        }
    }
}
