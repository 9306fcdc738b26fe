//! Configuration types for ElevenLabs speech synthesis.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ModelId, VoiceId};

/// "Rachel" premade voice
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8N2xHY";

/// Multilingual v2 synthesis model
pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// MP3, 44.1kHz, 128kbps
pub const DEFAULT_OUTPUT_FORMAT: &str = "mp3_44100_128";

/// Configuration for the ElevenLabs synthesizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// ElevenLabs API key
    pub api_key: String,

    /// Voice used for every narrative
    pub voice_id: String,

    /// Synthesis model
    pub model_id: String,

    /// Output format query parameter. Must stay an MP3 variant since
    /// artifacts are served as `audio/mpeg`.
    pub output_format: String,

    /// API root, overridable for proxies and tests
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Voice stability (0.0-1.0)
    pub stability: Option<f32>,

    /// Voice similarity boost (0.0-1.0)
    pub similarity_boost: Option<f32>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            base_url: super::ELEVENLABS_API_URL.to_string(),
            timeout_seconds: 60,
            stability: None,
            similarity_boost: None,
        }
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn voice(&self) -> VoiceId {
        VoiceId::new(self.voice_id.clone())
    }

    pub fn model(&self) -> ModelId {
        ModelId::new(self.model_id.clone())
    }
}
