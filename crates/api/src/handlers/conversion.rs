//! Handlers for conversion jobs: create, poll, download.
//!
//! Everything knowable before a job exists (rights confirmation, source URL,
//! tool presence) is rejected synchronously. Anything after that is only
//! observable by polling the job's status.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Deserializer, Serialize};
use tokio_util::io::ReaderStream;

use tunegrab_core::dependencies;
use tunegrab_core::error::CoreError;
use tunegrab_core::job::{Job, JobStatus};
use tunegrab_core::source_url;
use tunegrab_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Rejection message when the requester has not confirmed download rights.
pub const RIGHTS_NOT_CONFIRMED_MESSAGE: &str =
    "Please confirm you have the rights to download this content.";

/// Name used in the download header if the recorded name sanitizes to nothing.
const FALLBACK_FILE_NAME: &str = "audio.mp3";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Fields of the wrong JSON type read as absent, so they fail the same
/// validation as missing ones.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    #[serde(default, deserialize_with = "string_or_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "bool_or_none")]
    pub rights_confirmed: Option<bool>,
}

fn string_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

fn bool_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(serde_json::Value::deserialize(deserializer)?.as_bool())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub job_id: JobId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    /// Populated only when the job is finished.
    pub download_url: Option<String>,
    pub file_name: Option<String>,
}

impl From<&Job> for JobStatusResponse {
    fn from(job: &Job) -> Self {
        let finished = job.status() == JobStatus::Finished;
        Self {
            id: job.id(),
            status: job.status(),
            progress: job.progress(),
            message: job.message().to_string(),
            download_url: finished.then(|| download_url(job.id())),
            file_name: job.artifact().map(|a| a.name.clone()),
        }
    }
}

/// Relative URL clients use to fetch a finished job's artifact.
pub fn download_url(id: JobId) -> String {
    format!("/api/download/{id}")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a path id. Malformed ids cannot name a job, so they are reported as
/// not found rather than as a bad request.
fn parse_job_id(raw: &str) -> AppResult<JobId> {
    JobId::parse_str(raw).map_err(|_| {
        AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: raw.to_string(),
        })
    })
}

fn artifact_not_available(id: JobId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Artifact",
        id: id.to_string(),
    })
}

/// Replace each run of `\`, `/` or `"` with a single `_` so the name is safe
/// inside a quoted `Content-Disposition` filename.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for ch in name.chars() {
        if matches!(ch, '\\' | '/' | '"') {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else if !ch.is_control() {
            out.push(ch);
            in_run = false;
        }
    }
    if out.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        out
    }
}

/// Content type for an artifact, keyed on its extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("opus") | Some("ogg") | Some("oga") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// POST /api/convert
// ---------------------------------------------------------------------------

/// Validate the request, check the toolchain, and start a job.
pub async fn create_conversion(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> AppResult<Json<ConvertResponse>> {
    let Json(input) = payload?;

    if input.rights_confirmed != Some(true) {
        return Err(CoreError::Validation(RIGHTS_NOT_CONFIRMED_MESSAGE.to_string()).into());
    }

    let url = source_url::validate(input.url.as_deref())?;

    dependencies::check(&state.config.toolchain)
        .await
        .require_all()?;

    let submission = state.scheduler.submit(url).await;

    tracing::info!(job_id = %submission.job_id, "Conversion accepted");

    Ok(Json(ConvertResponse {
        job_id: submission.job_id,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/status/{id}
// ---------------------------------------------------------------------------

/// Current state of a job.
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<JobStatusResponse>> {
    let id = parse_job_id(&id)?;
    let job = state.store.get(id).await.ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: id.to_string(),
        })
    })?;
    Ok(Json(JobStatusResponse::from(&job)))
}

// ---------------------------------------------------------------------------
// GET /api/download/{id}
// ---------------------------------------------------------------------------

/// Stream a finished job's artifact.
///
/// An unknown job, an unfinished job, and an artifact that has since
/// vanished from disk are all reported as not found.
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id = parse_job_id(&id)?;
    let job = state
        .store
        .get(id)
        .await
        .ok_or_else(|| artifact_not_available(id))?;

    let artifact = match (job.status(), job.artifact()) {
        (JobStatus::Finished, Some(artifact)) => artifact.clone(),
        _ => return Err(artifact_not_available(id)),
    };

    let file = match tokio::fs::File::open(&artifact.path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(job_id = %id, "Artifact vanished before download");
            return Err(artifact_not_available(id));
        }
        Err(e) => return Err(e.into()),
    };
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(artifact_not_available(id));
    }

    let headers = [
        (CONTENT_TYPE, content_type_for(&artifact.name).to_string()),
        (CONTENT_LENGTH, metadata.len().to_string()),
        (
            CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                sanitize_file_name(&artifact.name)
            ),
        ),
    ];
    let body = Body::from_stream(ReaderStream::new(file));

    tracing::debug!(job_id = %id, bytes = metadata.len(), "Streaming artifact");

    Ok((headers, body).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_separator_runs() {
        assert_eq!(sanitize_file_name("a/b\\c\"d"), "a_b_c_d");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("x//\\\"y.mp3"), "x_y.mp3");
    }

    #[test]
    fn sanitize_keeps_ordinary_names() {
        let name = "0b6f6c2e-6f5a-4d55-9a53-0c1b7c1f2f7e.mp3";
        assert_eq!(sanitize_file_name(name), name);
    }

    #[test]
    fn sanitize_drops_control_characters() {
        assert_eq!(sanitize_file_name("a\r\nb.mp3"), "ab.mp3");
    }

    #[test]
    fn sanitize_empty_falls_back() {
        assert_eq!(sanitize_file_name(""), FALLBACK_FILE_NAME);
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("x.mp3"), "audio/mpeg");
        assert_eq!(content_type_for("x.MP3"), "audio/mpeg");
        assert_eq!(content_type_for("x.m4a"), "audio/mp4");
        assert_eq!(content_type_for("x.opus"), "audio/ogg");
        assert_eq!(content_type_for("x"), "application/octet-stream");
        assert_eq!(content_type_for("x.bin"), "application/octet-stream");
    }

    #[test]
    fn convert_request_reads_wrong_types_as_absent() {
        let input: ConvertRequest =
            serde_json::from_value(serde_json::json!({ "url": 123, "rightsConfirmed": "yes" }))
                .unwrap();
        assert_eq!(input.url, None);
        assert_eq!(input.rights_confirmed, None);

        let input: ConvertRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(input.url, None);
        assert_eq!(input.rights_confirmed, None);

        let input: ConvertRequest = serde_json::from_value(
            serde_json::json!({ "url": "https://youtu.be/abc", "rightsConfirmed": true }),
        )
        .unwrap();
        assert_eq!(input.url.as_deref(), Some("https://youtu.be/abc"));
        assert_eq!(input.rights_confirmed, Some(true));
    }

    #[test]
    fn status_response_only_links_finished_jobs() {
        let mut job = Job::new("https://youtu.be/abc");
        job.start();
        let running = JobStatusResponse::from(&job);
        assert!(running.download_url.is_none());
        assert!(running.file_name.is_none());

        let name = format!("{}.mp3", job.id());
        job.finish(tunegrab_core::job::Artifact {
            path: std::path::PathBuf::from("/tmp").join(&name),
            name: name.clone(),
        });
        let finished = JobStatusResponse::from(&job);
        assert_eq!(finished.download_url, Some(download_url(job.id())));
        assert_eq!(finished.file_name, Some(name));
        assert_eq!(finished.progress, 100);
    }

    #[test]
    fn status_response_uses_camel_case() {
        let job = Job::new("u");
        let json = serde_json::to_value(JobStatusResponse::from(&job)).unwrap();
        assert_eq!(json["status"], "queued");
        assert!(json.get("downloadUrl").is_some());
        assert!(json.get("fileName").is_some());
        assert!(json["downloadUrl"].is_null());
    }
}
