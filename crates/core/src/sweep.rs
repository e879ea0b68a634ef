//! Time-based reclamation of job records and artifact files.
//!
//! A sweep makes two independent passes:
//!
//! 1. **Records**: every terminal job created before the cutoff is removed
//!    from the store; a finished job's artifact is deleted first.
//!    Queued and running jobs are never touched.
//! 2. **Files**: every regular file in the output directory whose
//!    modification time is before the cutoff is deleted, whether or not a
//!    record still refers to it. This catches files left by jobs that never
//!    resolved.
//!
//! All I/O errors are logged and swallowed. Running a sweep twice with no
//! new activity deletes nothing the second time.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::job::JobStatus;
use crate::store::JobStore;
use crate::types::Timestamp;

/// Default age after which jobs and files are reclaimed (1 hour).
pub const DEFAULT_EXPIRY_SECS: u64 = 60 * 60;

/// Default interval between sweeps (10 minutes).
pub const DEFAULT_INTERVAL_SECS: u64 = 10 * 60;

/// Counts of what a single sweep removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Records removed from the store.
    pub jobs_removed: usize,
    /// Artifacts deleted on behalf of removed finished jobs.
    pub artifacts_deleted: usize,
    /// Files deleted by the directory age scan.
    pub files_deleted: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.jobs_removed == 0 && self.artifacts_deleted == 0 && self.files_deleted == 0
    }
}

/// Run one sweep over `store` and `output_dir`, treating everything older
/// than `now - expiry` as expired.
pub async fn sweep(
    store: &JobStore,
    output_dir: &Path,
    expiry: chrono::Duration,
    now: Timestamp,
) -> SweepReport {
    let cutoff = now - expiry;
    let mut report = SweepReport::default();

    for job in store.snapshot().await {
        if job.created_at() >= cutoff {
            continue;
        }
        match job.status() {
            JobStatus::Finished => {
                if let Some(artifact) = job.artifact() {
                    if remove_file_quietly(&artifact.path).await {
                        report.artifacts_deleted += 1;
                    }
                }
            }
            JobStatus::Failed => {}
            JobStatus::Queued | JobStatus::Running => continue,
        }
        if store.delete(job.id()).await.is_some() {
            tracing::debug!(job_id = %job.id(), status = %job.status(), "Swept expired job");
            report.jobs_removed += 1;
        }
    }

    report.files_deleted = sweep_directory(output_dir, cutoff).await;
    report
}

/// Delete every regular file in `dir` last modified before `cutoff`.
async fn sweep_directory(dir: &Path, cutoff: Timestamp) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Sweep could not read output directory");
            return 0;
        }
    };

    let mut deleted = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Sweep directory scan aborted");
                break;
            }
        };

        let path = entry.path();
        let modified = match entry.metadata().await {
            Ok(meta) if meta.is_file() => meta.modified().map(DateTime::<Utc>::from),
            Ok(_) => continue,
            Err(e) => Err(e),
        };
        match modified {
            Ok(modified) if modified < cutoff => {
                if remove_file_quietly(&path).await {
                    deleted += 1;
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Sweep skipped unreadable file");
            }
        }
    }
    deleted
}

/// Best-effort delete; returns whether a file was actually removed.
async fn remove_file_quietly(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Deleted expired file");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete expired file");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
