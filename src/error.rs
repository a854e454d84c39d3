use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Everything that can abort a trim request
#[derive(Error, Debug)]
pub enum TrimError {
    #[error("{0}")]
    InvalidRange(&'static str),

    #[error("invalid form: {0}")]
    InvalidForm(String),

    #[error("failed to download audio_url: {0}")]
    Download(String),

    #[error("ffmpeg error: {tail}")]
    Transcode { tail: String },

    #[error("failed to run {tool}: {message}")]
    ToolUnavailable { tool: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrimError {
    pub fn status(&self) -> StatusCode {
        match self {
            TrimError::InvalidRange(_) | TrimError::InvalidForm(_) | TrimError::Download(_) => {
                StatusCode::BAD_REQUEST
            }
            TrimError::Transcode { .. } | TrimError::ToolUnavailable { .. } | TrimError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<reqwest::Error> for TrimError {
    fn from(err: reqwest::Error) -> Self {
        TrimError::Download(err.to_string())
    }
}

impl IntoResponse for TrimError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = serde_json::json!({ "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TrimError>;
