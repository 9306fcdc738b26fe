//! ElevenLabs speech synthesizer.
//!
//! # API Reference
//!
//! - Endpoint: `POST {base}/v1/text-to-speech/{voice_id}?output_format=...`
//! - Auth: `xi-api-key` header
//! - Body: `{"text", "model_id", "voice_settings"?}`
//! - Response: the encoded audio bytes

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::config::SynthesisConfig;
use super::{ModelId, SpeechSynthesizer, SynthesisError, SynthesisResult, VoiceId};

/// ElevenLabs API root
pub const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io";

const DEFAULT_STABILITY: f32 = 0.5;
const DEFAULT_SIMILARITY_BOOST: f32 = 0.75;

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_settings: Option<VoiceSettings>,
}

/// Synthesizer backed by the ElevenLabs text-to-speech API
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_key: Zeroizing<String>,
    base_url: reqwest::Url,
    output_format: String,
    voice_settings: Option<(f32, f32)>,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: &SynthesisConfig) -> SynthesisResult<Self> {
        if config.api_key.is_empty() {
            return Err(SynthesisError::Configuration(
                "ElevenLabs API key not configured (ELEVENLABS_API_KEY)".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SynthesisError::Configuration(e.to_string()))?;

        // The API expects both fields together
        let voice_settings = match (config.stability, config.similarity_boost) {
            (None, None) => None,
            (stability, similarity) => Some((
                stability.unwrap_or(DEFAULT_STABILITY).clamp(0.0, 1.0),
                similarity.unwrap_or(DEFAULT_SIMILARITY_BOOST).clamp(0.0, 1.0),
            )),
        };

        let base_url = reqwest::Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                SynthesisError::Configuration(format!(
                    "Invalid ElevenLabs base URL: {}",
                    config.base_url
                ))
            })?;

        Ok(Self {
            client,
            api_key: Zeroizing::new(config.api_key.clone()),
            base_url,
            output_format: config.output_format.clone(),
            voice_settings,
        })
    }

    /// Text-to-speech endpoint for `voice`; the id is encoded as one path segment.
    fn endpoint(&self, voice: &VoiceId) -> SynthesisResult<reqwest::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SynthesisError::Configuration(format!("Invalid ElevenLabs base URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v1", "text-to-speech", voice.as_str()]);
        Ok(url)
    }

    fn build_request(
        &self,
        text: &str,
        voice: &VoiceId,
        model: &ModelId,
    ) -> SynthesisResult<reqwest::RequestBuilder> {
        let url = self.endpoint(voice)?;
        let body = TextToSpeechRequest {
            text,
            model_id: model.as_str(),
            voice_settings: self
                .voice_settings
                .map(|(stability, similarity_boost)| VoiceSettings {
                    stability,
                    similarity_boost,
                }),
        };

        Ok(self
            .client
            .post(url)
            .query(&[("output_format", self.output_format.as_str())])
            .header("xi-api-key", self.api_key.as_str())
            .header("Accept", "audio/mpeg")
            .json(&body))
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceId,
        model: &ModelId,
    ) -> SynthesisResult<Bytes> {
        debug!(
            voice = %voice,
            model = %model,
            chars = text.len(),
            "Requesting speech synthesis"
        );

        let response = self
            .build_request(text, voice, model)?
            .send()
            .await
            .map_err(SynthesisError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = %status,
                body = %body,
                "ElevenLabs API returned error"
            );
            return Err(SynthesisError::from_status(status.as_u16(), body));
        }

        let audio = response
            .bytes()
            .await
            .map_err(SynthesisError::from_transport)?;

        if audio.is_empty() {
            return Err(SynthesisError::EmptyPayload);
        }

        debug!(bytes = audio.len(), "Speech synthesized");
        Ok(audio)
    }

    fn provider_name(&self) -> &'static str {
        "elevenlabs"
    }
}
