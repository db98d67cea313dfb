use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Failure taxonomy of the ingestion pipeline.
///
/// Configuration and Transport errors are source-level and end a run as
/// FAILURE. Normalization and Persistence errors are scoped to one posting.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("normalization error: {0}")]
    Normalization(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for IngestError {
    fn from(e: sqlx::Error) -> Self {
        IngestError::Persistence(e.to_string())
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IngestError::Transport(format!("request timed out: {e}"))
        } else {
            IngestError::Transport(e.to_string())
        }
    }
}

/// Rejections of the manual re-run trigger.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("Job source {0} not found")]
    NotFound(i32),

    #[error("Job source {0} is disabled")]
    Disabled(i32),

    #[error(transparent)]
    Store(#[from] IngestError),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] IngestError),
}

impl From<TriggerError> for AppError {
    fn from(e: TriggerError) -> Self {
        match e {
            TriggerError::NotFound(_) => AppError::NotFound(e.to_string()),
            TriggerError::Disabled(_) => AppError::BadRequest(e.to_string()),
            TriggerError::Store(inner) => AppError::Store(inner),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
