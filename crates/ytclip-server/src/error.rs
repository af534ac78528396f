use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use ytclip_core::error::{CatalogError, RunnerError, ValidationError, YtClipError};

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent `{ error, code }`
/// JSON bodies. Only errors surfaced before job acceptance reach HTTP
/// status codes; post-acceptance failures travel the progress stream.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Extraction tool is not available")]
    ToolUnavailable,

    #[error("Catalog is not configured")]
    CatalogUnconfigured,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<YtClipError> for ApiError {
    fn from(err: YtClipError) -> Self {
        match err {
            YtClipError::Validation(e) => ApiError::Validation(e),
            YtClipError::Runner(RunnerError::ToolUnavailable) => ApiError::ToolUnavailable,
            YtClipError::Catalog(e) => ApiError::Catalog(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(err) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", err.to_string())
            }
            ApiError::ToolUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "TOOL_UNAVAILABLE",
                self.to_string(),
            ),
            ApiError::CatalogUnconfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CATALOG_UNCONFIGURED",
                self.to_string(),
            ),
            ApiError::Catalog(CatalogError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Recording {} not found", id),
            ),
            ApiError::Catalog(err) => {
                tracing::error!("Catalog request failed: {}", err);
                (StatusCode::BAD_GATEWAY, "CATALOG_ERROR", err.to_string())
            }
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", what),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
