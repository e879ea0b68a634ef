//! In-memory job table.
//!
//! The store is a plain keyed container: it performs no merging and knows
//! nothing about the job state machine beyond handing out `&mut Job` to a
//! single closure at a time. Each record has exactly one writer (its
//! supervisor) so the only contention is on the map itself.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::job::Job;
use crate::types::JobId;

/// Concurrency-safe map from job id to job record.
///
/// Designed to be wrapped in `Arc` and shared by the scheduler, the
/// supervisors, the HTTP handlers and the sweep.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queued job for `source_url` and return its id.
    pub async fn create(&self, source_url: impl Into<String>) -> JobId {
        self.insert(Job::new(source_url)).await
    }

    /// Insert an already-built record, replacing any record with the same id.
    pub async fn insert(&self, job: Job) -> JobId {
        let id = job.id();
        self.jobs.write().await.insert(id, job);
        id
    }

    /// Snapshot of a single record.
    pub async fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Remove a record, returning it if it existed.
    pub async fn delete(&self, id: JobId) -> Option<Job> {
        self.jobs.write().await.remove(&id)
    }

    /// Run `f` against the record for `id` under the write lock.
    ///
    /// Returns `None` if the record no longer exists (e.g. it was swept).
    pub async fn update<R>(&self, id: JobId, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        self.jobs.write().await.get_mut(&id).map(f)
    }

    /// Snapshot of every record, in no particular order.
    pub async fn snapshot(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
