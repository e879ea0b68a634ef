pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /convert              start a conversion (POST)
/// /status/{id}          poll a job
/// /download/{id}        fetch a finished job's audio
/// /diagnostics          toolchain presence
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/convert", post(handlers::conversion::create_conversion))
        .route("/status/{id}", get(handlers::conversion::get_status))
        .route("/download/{id}", get(handlers::conversion::download_artifact))
        .route("/diagnostics", get(handlers::diagnostics::get_diagnostics))
}
