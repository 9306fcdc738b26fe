//! Narrative generation
//!
//! Turns an [`EmotionLabel`] into a short uplifting story by rendering a
//! prompt template and sending it to a remote generative-language model.
//! The returned text is passed through untouched.

pub mod config;
pub mod gemini;

pub use config::{DEFAULT_STORY_PROMPT, EMOTION_PLACEHOLDER, GenerationConfig, PromptTemplate};
pub use gemini::{GEMINI_API_URL, GeminiNarrativeGenerator};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::classifier::EmotionLabel;
use crate::core::retry::Transient;

/// Generated story text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NarrativeText(String);

impl NarrativeText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NarrativeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while generating a narrative
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation request timed out: {0}")]
    Timeout(String),

    #[error("Failed to reach generation service: {0}")]
    Connection(String),

    #[error("Generation rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Generation service error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Generation service rejected credentials: {0}")]
    Authentication(String),

    #[error("Generation request rejected: {0}")]
    InvalidRequest(String),

    #[error("Generation service returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("Generation is not configured: {0}")]
    Configuration(String),
}

impl GenerationError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Authentication(body),
            408 => Self::Timeout(body),
            429 => Self::RateLimited(body),
            500..=599 => Self::ServerError {
                status,
                message: body,
            },
            _ => Self::InvalidRequest(format!("HTTP {status}: {body}")),
        }
    }

    /// Classify a transport-level failure
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            Self::Configuration(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl Transient for GenerationError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connection(_) | Self::RateLimited(_) | Self::ServerError { .. }
        )
    }
}

/// Result type for generation operations
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Produces a short narrative reflecting an emotion.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Generate one narrative for `emotion`.
    async fn generate(&self, emotion: EmotionLabel) -> GenerationResult<NarrativeText>;

    /// Provider name for logs
    fn provider_name(&self) -> &'static str;
}
