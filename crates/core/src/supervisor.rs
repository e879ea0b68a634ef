//! Process supervision for a single conversion job.
//!
//! A [`Supervisor`] owns one converter process for one job: it starts the
//! process, feeds both output streams through [`LineBuffer`]s, applies
//! parsed [`Signal`]s to the job record, and resolves the exit status into a
//! terminal state. Every failure is recorded in the job; nothing is returned
//! to the caller as an error and nothing is retried.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use crate::artifact::{self, Discovery};
use crate::dependencies::ToolCommand;
use crate::line_buffer::LineBuffer;
use crate::progress::{self, Signal};
use crate::store::JobStore;
use crate::types::JobId;

/// Failure message when the converter cannot be spawned at all.
pub const MSG_TOOL_UNAVAILABLE: &str = "yt-dlp is not available on the server.";
/// Failure message when the converter exits zero but left no file behind.
pub const MSG_ARTIFACT_MISSING: &str = "The MP3 file could not be located.";
/// Failure message for a non-zero exit with no captured error line.
pub const MSG_CONVERSION_FAILED: &str = "Conversion failed. Please try another link.";

/// Target audio container.
pub const DEFAULT_AUDIO_FORMAT: &str = "mp3";
/// `0` asks the converter for its best VBR quality.
pub const DEFAULT_AUDIO_QUALITY: &str = "0";

/// Size of each read from a child's stdout/stderr pipe.
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Stderr lines containing this keyword are advisory and never recorded.
const ADVISORY_KEYWORD: &str = "warning";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything a supervisor needs to launch the converter.
#[derive(Debug, Clone)]
pub struct ConversionSettings {
    pub converter: ToolCommand,
    /// Directory artifacts are written to; shared by all jobs.
    pub output_dir: PathBuf,
    pub audio_format: String,
    pub audio_quality: String,
}

impl ConversionSettings {
    pub fn new(converter: ToolCommand, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            converter,
            output_dir: output_dir.into(),
            audio_format: DEFAULT_AUDIO_FORMAT.to_string(),
            audio_quality: DEFAULT_AUDIO_QUALITY.to_string(),
        }
    }

    /// Arguments for one conversion, appended after the converter's prefix
    /// arguments. The source URL is always last.
    pub fn build_args(&self, id: JobId, source_url: &str) -> Vec<String> {
        let template = artifact::output_template(&self.output_dir, id);
        vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            self.audio_format.clone(),
            "--audio-quality".to_string(),
            self.audio_quality.clone(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            source_url.to_string(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a supervised run ended. The same information is recorded in the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Exit zero and the artifact was located.
    Finished(Discovery),
    /// Exit zero but no artifact could be found.
    ArtifactMissing,
    /// Non-zero exit (or death by signal, `exit_code: None`).
    ProcessFailed {
        exit_code: Option<i32>,
        message: String,
    },
    /// The converter could not be spawned.
    SpawnFailed { error: String },
    /// The job was missing or not queued, so nothing was launched.
    NotStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Stdout,
    Stderr,
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

pub struct Supervisor {
    store: Arc<JobStore>,
    settings: Arc<ConversionSettings>,
    job_id: JobId,
}

impl Supervisor {
    pub fn new(store: Arc<JobStore>, settings: Arc<ConversionSettings>, job_id: JobId) -> Self {
        Self {
            store,
            settings,
            job_id,
        }
    }

    /// Drive the job from `queued` to a terminal state.
    pub async fn run(self) -> Outcome {
        let id = self.job_id;

        let Some(source_url) = self.claim().await else {
            tracing::warn!(job_id = %id, "Job missing or already started, not launching");
            return Outcome::NotStarted;
        };

        let mut cmd = self.settings.converter.command();
        cmd.args(self.settings.build_args(id, &source_url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::info!(
            job_id = %id,
            converter = %self.settings.converter,
            source_url = %source_url,
            "Starting conversion",
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let error = e.to_string();
                tracing::error!(job_id = %id, error = %error, "Failed to spawn converter");
                self.store
                    .update(id, |job| job.fail(MSG_TOOL_UNAVAILABLE, Some(error.clone())))
                    .await;
                return Outcome::SpawnFailed { error };
            }
        };

        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<(StreamKind, String)>();
        let stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(StreamKind::Stdout, out, line_tx.clone())));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(StreamKind::Stderr, err, line_tx.clone())));
        drop(line_tx);

        let mut last_error: Option<String> = None;
        while let Some((stream, line)) = line_rx.recv().await {
            match stream {
                StreamKind::Stdout => {
                    tracing::trace!(job_id = %id, line = %line, "converter stdout");
                    if let Some(signal) = progress::parse(&line) {
                        self.apply(signal).await;
                    }
                }
                StreamKind::Stderr => {
                    if line.to_lowercase().contains(ADVISORY_KEYWORD) {
                        tracing::debug!(job_id = %id, line = %line, "Ignoring converter warning");
                        continue;
                    }
                    tracing::debug!(job_id = %id, line = %line, "converter stderr");
                    last_error = Some(line);
                }
            }
        }

        for task in [stdout_task, stderr_task].into_iter().flatten() {
            let _ = task.await;
        }

        let exit_code = match child.wait().await {
            Ok(status) if status.success() => return self.resolve_success(last_error).await,
            Ok(status) => status.code(),
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Failed to wait for converter");
                None
            }
        };

        let message = last_error
            .clone()
            .unwrap_or_else(|| MSG_CONVERSION_FAILED.to_string());
        tracing::warn!(job_id = %id, ?exit_code, message = %message, "Conversion failed");
        self.store
            .update(id, |job| job.fail(message.clone(), last_error))
            .await;
        Outcome::ProcessFailed { exit_code, message }
    }

    /// Move the job to `running` and return its source URL.
    async fn claim(&self) -> Option<String> {
        self.store
            .update(self.job_id, |job| {
                job.start().then(|| job.source_url().to_string())
            })
            .await
            .flatten()
    }

    async fn apply(&self, signal: Signal) {
        self.store
            .update(self.job_id, |job| job.apply_signal(signal))
            .await;
    }

    /// Exit zero: locate the artifact or fail, keeping any captured error
    /// line as the failure detail.
    async fn resolve_success(&self, last_error: Option<String>) -> Outcome {
        let id = self.job_id;
        match artifact::discover(&self.settings.output_dir, id, &self.settings.audio_format).await
        {
            Some(discovery) => {
                tracing::info!(
                    job_id = %id,
                    file_name = %discovery.artifact.name,
                    lookup = ?discovery.lookup,
                    "Conversion finished",
                );
                let artifact = discovery.artifact.clone();
                self.store.update(id, |job| job.finish(artifact)).await;
                Outcome::Finished(discovery)
            }
            None => {
                tracing::warn!(job_id = %id, "Converter exited cleanly but no artifact was found");
                self.store
                    .update(id, |job| job.fail(MSG_ARTIFACT_MISSING, last_error))
                    .await;
                Outcome::ArtifactMissing
            }
        }
    }
}

/// Read `reader` to EOF, forwarding each complete line tagged with `stream`.
async fn forward_lines<R: AsyncRead + Unpin>(
    stream: StreamKind,
    mut reader: R,
    sender: mpsc::UnboundedSender<(StreamKind, String)>,
) {
    let mut buffer = LineBuffer::new();
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                for line in buffer.push(&chunk[..n]) {
                    if sender.send((stream, line)).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::debug!(?stream, error = %e, "Output stream read failed");
                break;
            }
        }
    }

    if let Some(line) = buffer.finish() {
        let _ = sender.send((stream, line));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
