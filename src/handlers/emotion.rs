use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::core::classifier::EmotionLabel;
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Request body for `POST /detect-emotion`
#[derive(Debug, Deserialize)]
pub struct DetectEmotionRequest {
    pub text: Option<String>,
}

/// Response body for `POST /detect-emotion`
#[derive(Debug, Serialize)]
pub struct DetectEmotionResponse {
    pub emotion: EmotionLabel,
}

/// Classify the emotional tone of a text.
///
/// Empty or whitespace-only text yields `neutral`. A missing `text` field or
/// a malformed body is an input error.
pub async fn detect_emotion(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DetectEmotionRequest>, JsonRejection>,
) -> AppResult<Json<DetectEmotionResponse>> {
    let Json(request) = payload.map_err(|rejection| AppError::Input(rejection.body_text()))?;
    let text = request
        .text
        .ok_or_else(|| AppError::Input("Missing required field: text".to_string()))?;

    let emotion = state.pipeline.detect_emotion(&text).await?;
    info!(emotion = %emotion, chars = text.len(), "Emotion detection complete");

    Ok(Json(DetectEmotionResponse { emotion }))
}
