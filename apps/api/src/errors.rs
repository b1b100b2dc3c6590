use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::export::ExportError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Preview missing: {0}")]
    PreviewMissing(String),

    #[error("Export already in progress")]
    ExportInProgress,

    #[error("Export quota exceeded on plan {plan}")]
    QuotaExceeded {
        plan: String,
        limit: Option<u32>,
        reset_date: Option<String>,
    },

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::PreviewMissing { .. } => AppError::PreviewMissing(err.to_string()),
            ExportError::InProgress => AppError::ExportInProgress,
            ExportError::Transport(e) => AppError::RenderFailed(e.to_string()),
            ExportError::InvariantViolation(_) => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut details = Map::new();
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PreviewMissing(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "PREVIEW_MISSING",
                format!("{msg}; open the resume preview and try again"),
            ),
            AppError::ExportInProgress => (
                StatusCode::CONFLICT,
                "EXPORT_IN_PROGRESS",
                "An export is already running for this session".to_string(),
            ),
            AppError::QuotaExceeded {
                plan,
                limit,
                reset_date,
            } => {
                details.insert("plan".to_string(), json!(plan));
                details.insert("limit".to_string(), json!(limit));
                details.insert("resetDate".to_string(), json!(reset_date));
                (
                    StatusCode::FORBIDDEN,
                    "QUOTA_EXCEEDED",
                    format!("PDF download limit reached on the {plan} plan"),
                )
            }
            AppError::RenderFailed(msg) => {
                tracing::error!("Render failed: {msg}");
                details.insert("retry".to_string(), Value::Bool(true));
                (
                    StatusCode::BAD_GATEWAY,
                    "RENDER_FAILED",
                    format!("Failed to generate PDF: {msg}"),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = Map::new();
        error.insert("code".to_string(), json!(code));
        error.insert("message".to_string(), json!(message));
        error.extend(details);

        let body = Json(json!({ "error": Value::Object(error) }));
        (status, body).into_response()
    }
}
