//! Speech synthesis
//!
//! Converts a finished narrative into one complete encoded audio payload.
//! Voice and synthesis model are configured once at startup and passed
//! explicitly on every call.

pub mod config;
pub mod elevenlabs;

pub use config::{DEFAULT_MODEL_ID, DEFAULT_OUTPUT_FORMAT, DEFAULT_VOICE_ID, SynthesisConfig};
pub use elevenlabs::{ELEVENLABS_API_URL, ElevenLabsSynthesizer};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::retry::Transient;

/// Provider voice identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceId(String);

impl VoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider synthesis model identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while synthesizing speech
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Synthesis request timed out: {0}")]
    Timeout(String),

    #[error("Failed to reach synthesis service: {0}")]
    Connection(String),

    #[error("Synthesis rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Synthesis service error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Synthesis service rejected credentials: {0}")]
    Authentication(String),

    #[error("Synthesis request rejected: {0}")]
    InvalidRequest(String),

    #[error("Synthesis service returned an empty audio payload")]
    EmptyPayload,

    #[error("Synthesis is not configured: {0}")]
    Configuration(String),
}

impl SynthesisError {
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
        } else if err.is_builder() {
            Self::Configuration(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl Transient for SynthesisError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connection(_) | Self::RateLimited(_) | Self::ServerError { .. }
        )
    }
}

/// Result type for synthesis operations
pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// Converts text into a complete encoded audio payload.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text`. Returns the whole payload; never an empty one.
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceId,
        model: &ModelId,
    ) -> SynthesisResult<Bytes>;

    /// Provider name for logs
    fn provider_name(&self) -> &'static str;
}
