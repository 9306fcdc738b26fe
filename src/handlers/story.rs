use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::classifier::EmotionLabel;
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Request body for `POST /generate-story`
#[derive(Debug, Default, Deserialize)]
pub struct GenerateStoryRequest {
    /// Any JSON value; only a recognized label string is honored
    #[serde(default)]
    pub emotion: Option<serde_json::Value>,
}

impl GenerateStoryRequest {
    /// Resolve the requested emotion, falling back to `neutral` when it is
    /// absent, not a string or not a known label.
    pub fn emotion(&self) -> EmotionLabel {
        EmotionLabel::parse_or_neutral(self.emotion.as_ref().and_then(|v| v.as_str()))
    }
}

/// Response body for `POST /generate-story`
#[derive(Debug, Serialize)]
pub struct GenerateStoryResponse {
    pub emotion: EmotionLabel,
    pub story: String,
    pub audio_url: String,
}

/// Generate a narrative for an emotion and narrate it.
pub async fn generate_story(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateStoryRequest>, JsonRejection>,
) -> AppResult<Json<GenerateStoryResponse>> {
    let Json(request) = payload.map_err(|rejection| AppError::Input(rejection.body_text()))?;
    let emotion = request.emotion();
    if let Some(requested) = &request.emotion
        && requested.as_str().and_then(EmotionLabel::parse).is_none()
    {
        debug!(requested = %requested, "Unrecognized emotion, using neutral");
    }

    let result = state.pipeline.generate_story_and_audio(emotion).await?;
    info!(
        emotion = %result.emotion,
        reference = %result.reference,
        "Story generation complete"
    );

    Ok(Json(GenerateStoryResponse {
        emotion: result.emotion,
        audio_url: result.reference.url_path(),
        story: result.story.into_string(),
    }))
}
