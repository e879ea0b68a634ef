use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tunegrab_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `tunegrab_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An I/O error while reading an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request body was missing, malformed, or too large.
    #[error(transparent)]
    JsonBody(#[from] JsonRejection),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                // Missing tools are an operator problem; the message is safe to show.
                CoreError::DependencyMissing(msg) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DEPENDENCY_MISSING",
                    msg.clone(),
                ),
            },

            // --- I/O errors ---
            AppError::Io(err) => {
                tracing::error!(error = %err, "I/O error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Error reading file.".to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::JsonBody(rejection) => {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    (
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "PAYLOAD_TOO_LARGE",
                        "Payload too large".to_string(),
                    )
                } else {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", rejection.body_text())
                }
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
