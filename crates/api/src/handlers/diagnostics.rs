//! Toolchain diagnostics for operators.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use tunegrab_core::dependencies;

use crate::state::AppState;

/// Which external tools the server can run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResponse {
    pub ok: bool,
    pub missing: Vec<&'static str>,
    pub yt_dlp: bool,
    pub ffmpeg: bool,
}

/// GET /api/diagnostics
pub async fn get_diagnostics(State(state): State<AppState>) -> Json<DiagnosticsResponse> {
    let report = dependencies::check(&state.config.toolchain).await;
    if !report.ok() {
        tracing::warn!(missing = ?report.missing(), "Toolchain incomplete");
    }
    Json(DiagnosticsResponse {
        ok: report.ok(),
        missing: report.missing(),
        yt_dlp: report.yt_dlp,
        ffmpeg: report.ffmpeg,
    })
}
