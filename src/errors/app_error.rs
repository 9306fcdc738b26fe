//! Application error returned by HTTP handlers.
//!
//! Every error renders as `{"error": message, "kind": kind}` so clients can
//! branch on `kind` without parsing messages.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::core::pipeline::PipelineError;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, malformed or invalid request input
    #[error("{0}")]
    Input(String),

    /// Unknown or expired resource
    #[error("{0}")]
    NotFound(String),

    /// Failure raised by the story pipeline
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Input(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Pipeline(err) => match err {
                PipelineError::Input(_) => StatusCode::BAD_REQUEST,
                PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
                PipelineError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
                PipelineError::Inference(_) | PipelineError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                PipelineError::Generation(_) | PipelineError::Synthesis(_) => {
                    if err.is_transient() {
                        StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        StatusCode::BAD_GATEWAY
                    }
                }
            },
        }
    }

    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input_error",
            Self::NotFound(_) => "not_found",
            Self::Pipeline(err) => err.kind(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), status = %status, error = %self, "Request failed");
        }

        (
            status,
            Json(json!({
                "error": self.to_string(),
                "kind": self.kind(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifacts::StorageError;
    use crate::core::narrative::GenerationError;
    use crate::core::speech::SynthesisError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Input("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(PipelineError::Generation(GenerationError::Timeout(
                String::new()
            )))
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(PipelineError::Synthesis(SynthesisError::Authentication(
                String::new()
            )))
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(PipelineError::Storage(StorageError::EmptyPayload)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(PipelineError::NotFound("x".to_string())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(PipelineError::ModelLoad(String::new())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(AppError::Input(String::new()).kind(), "input_error");
        assert_eq!(
            AppError::from(PipelineError::Input(String::new())).kind(),
            "input_error"
        );
        assert_eq!(
            AppError::from(PipelineError::Synthesis(SynthesisError::EmptyPayload)).kind(),
            "synthesis_error"
        );
    }

    #[tokio::test]
    async fn test_response_body() {
        let response = AppError::NotFound("Audio not found: abc.mp3".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["error"], "Audio not found: abc.mp3");
    }
}
