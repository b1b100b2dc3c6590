use thiserror::Error;

use crate::render_client::RenderError;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("live preview root '.{class}' not found")]
    PreviewMissing { class: String },

    #[error("an export is already in progress for this session")]
    InProgress,

    #[error("assembly invariant violated: {0}")]
    InvariantViolation(String),

    #[error("transport error: {0}")]
    Transport(#[from] RenderError),
}
