//! Job creation and supervisor launch.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::store::JobStore;
use crate::supervisor::{ConversionSettings, Outcome, Supervisor};
use crate::sweep::{self, SweepReport};
use crate::types::{JobId, Timestamp};

/// A freshly accepted job and the task supervising it.
///
/// Dropping the handle detaches the supervisor; the job still runs to
/// completion.
#[derive(Debug)]
pub struct Submission {
    pub job_id: JobId,
    pub handle: JoinHandle<Outcome>,
}

/// Creates jobs and hands each to its own [`Supervisor`] task.
///
/// Cheaply cloneable; all clones share the same store and settings.
#[derive(Debug, Clone)]
pub struct Scheduler {
    store: Arc<JobStore>,
    settings: Arc<ConversionSettings>,
}

impl Scheduler {
    pub fn new(store: Arc<JobStore>, settings: ConversionSettings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
        }
    }

    /// Create a job for an already validated source URL and start
    /// supervising it. Returns immediately; the outcome is only observable
    /// through the store (or the returned handle).
    pub async fn submit(&self, source_url: impl Into<String>) -> Submission {
        let job_id = self.store.create(source_url).await;
        tracing::info!(job_id = %job_id, "Job created");

        let supervisor = Supervisor::new(Arc::clone(&self.store), Arc::clone(&self.settings), job_id);
        let handle = tokio::spawn(supervisor.run());

        Submission { job_id, handle }
    }

    /// Reclaim expired jobs and artifacts relative to `now`.
    pub async fn sweep(&self, expiry: chrono::Duration, now: Timestamp) -> SweepReport {
        sweep::sweep(&self.store, &self.settings.output_dir, expiry, now).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
