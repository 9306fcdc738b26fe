use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::artifacts::{ARTIFACT_CONTENT_TYPE, ArtifactRef};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Serve a stored narrative audio artifact by reference
pub async fn download_audio(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> AppResult<Response> {
    let reference = ArtifactRef::parse(&reference).map_err(|_| {
        debug!(reference = %reference, "Rejected malformed audio reference");
        AppError::NotFound(format!("Audio not found: {reference}"))
    })?;

    let body = state.pipeline.open_audio(&reference).await?;
    let size = body.len();

    info!(reference = %reference, bytes = size, "Audio download");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(ARTIFACT_CONTENT_TYPE),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("inline; filename=\"{}\"", reference))
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok((StatusCode::OK, headers, body).into_response())
}
