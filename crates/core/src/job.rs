//! The job record and its state machine.
//!
//! ```text
//! queued ──start──▶ running ──finish──▶ finished
//!    │                 │
//!    └──────fail───────┴──────fail────▶ failed
//! ```
//!
//! Both terminal states are absorbing: every transition method is a no-op
//! (returning `false`) once `finished` or `failed` has been recorded. Fields
//! are private so the only way to mutate a record is through these methods.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::progress::{Phase, Signal};
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Phase messages and progress watermarks
// ---------------------------------------------------------------------------

/// Message of a freshly created job.
pub const MSG_QUEUED: &str = "Queued";
/// Message once the supervisor has taken the job.
pub const MSG_STARTING: &str = "Starting download";
/// Message while percentages are being reported.
pub const MSG_DOWNLOADING: &str = "Downloading audio";
/// Message once the extraction phase marker has been seen.
pub const MSG_EXTRACTING: &str = "Extracting MP3";
/// Message of a finished job.
pub const MSG_READY: &str = "Ready to download";

/// Progress shown as soon as a job starts, before the converter reports anything.
pub const PROGRESS_FLOOR: u8 = 2;
/// Progress shown once extraction begins.
pub const EXTRACTION_WATERMARK: u8 = 90;
/// Progress of a finished job.
pub const PROGRESS_COMPLETE: u8 = 100;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Finished,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// The output file of a finished job. The file itself lives on disk and is
/// owned by the sweep, not by the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Bare file name, e.g. `<job id>.mp3`.
    pub name: String,
    /// Full path inside the output directory.
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    source_url: String,
    status: JobStatus,
    progress: u8,
    message: String,
    created_at: Timestamp,
    artifact: Option<Artifact>,
    error_detail: Option<String>,
}

impl Job {
    /// Create a queued job with a fresh id.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self::with_created_at(source_url, chrono::Utc::now())
    }

    /// Create a queued job with an explicit creation time.
    pub fn with_created_at(source_url: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            source_url: source_url.into(),
            status: JobStatus::Queued,
            progress: 0,
            message: MSG_QUEUED.to_string(),
            created_at,
            artifact: None,
            error_detail: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Set only while `finished`.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// Set only while `failed`.
    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// `queued -> running`, seeding the liveness floor.
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Running;
        self.progress = self.progress.max(PROGRESS_FLOOR);
        self.message = MSG_STARTING.to_string();
        true
    }

    /// Apply a parsed output signal to a running job.
    ///
    /// Percentages only ever ratchet progress upwards; the extraction phase
    /// lifts it to [`EXTRACTION_WATERMARK`]. Returns whether the job was
    /// running (and therefore whether the signal was considered).
    pub fn apply_signal(&mut self, signal: Signal) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        match signal {
            Signal::Percent(percent) => {
                self.progress = self.progress.max(percent.min(PROGRESS_COMPLETE));
                self.message = MSG_DOWNLOADING.to_string();
            }
            Signal::Phase(Phase::Extracting) => {
                self.progress = self.progress.max(EXTRACTION_WATERMARK);
                self.message = MSG_EXTRACTING.to_string();
            }
        }
        true
    }

    /// `running -> finished` with a located artifact.
    pub fn finish(&mut self, artifact: Artifact) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Finished;
        self.progress = PROGRESS_COMPLETE;
        self.message = MSG_READY.to_string();
        self.artifact = Some(artifact);
        true
    }

    /// `queued | running -> failed`. Progress keeps its last value.
    pub fn fail(&mut self, message: impl Into<String>, detail: Option<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        let message = message.into();
        self.status = JobStatus::Failed;
        self.error_detail = Some(detail.unwrap_or_else(|| message.clone()));
        self.message = message;
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
