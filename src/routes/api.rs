use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, audio, emotion, story};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/detect-emotion", post(emotion::detect_emotion))
        .route("/generate-story", post(story::generate_story))
        .route("/audio/{reference}", get(audio::download_audio))
        .layer(TraceLayer::new_for_http())
}

/// Create the full application router: health check plus API routes
pub fn create_app_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .merge(create_api_router())
}
