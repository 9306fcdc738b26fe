//! Gemini narrative generator.
//!
//! # API Reference
//!
//! - Endpoint: `POST {base}/v1beta/models/{model}:generateContent`
//! - Auth: `x-goog-api-key` header
//! - Output: `candidates[0].content.parts[*].text`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::config::{GenerationConfig, PromptTemplate};
use super::{GenerationError, GenerationResult, NarrativeGenerator, NarrativeText};
use crate::core::classifier::EmotionLabel;

/// Gemini API root
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

impl GeminiResponse {
    /// Concatenate the text parts of the first candidate
    fn into_text(self) -> GenerationResult<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenerationError::InvalidResponse(format!(
                "prompt blocked: {reason}"
            )));
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::InvalidResponse(
                "response contained no text".to_string(),
            ));
        }

        Ok(text)
    }
}

/// Narrative generator backed by the Gemini `generateContent` API
pub struct GeminiNarrativeGenerator {
    client: reqwest::Client,
    api_key: Zeroizing<String>,
    model: String,
    endpoint: String,
    prompt_template: PromptTemplate,
}

impl GeminiNarrativeGenerator {
    /// Create a generator. The HTTP client carries the configured timeout.
    pub fn new(config: &GenerationConfig) -> GenerationResult<Self> {
        if config.api_key.is_empty() {
            return Err(GenerationError::Configuration(
                "Gemini API key not configured (GEMINI_API_KEY)".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GenerationError::Configuration(e.to_string()))?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            client,
            api_key: Zeroizing::new(config.api_key.clone()),
            model: config.model.clone(),
            endpoint,
            prompt_template: config.prompt_template.clone(),
        })
    }

    /// Get the configured model
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the request endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(&self, prompt: String) -> reqwest::RequestBuilder {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        self.client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.as_str())
            .header("Content-Type", "application/json")
            .json(&body)
    }
}

#[async_trait]
impl NarrativeGenerator for GeminiNarrativeGenerator {
    async fn generate(&self, emotion: EmotionLabel) -> GenerationResult<NarrativeText> {
        let prompt = self.prompt_template.render(emotion);
        debug!(model = %self.model, emotion = %emotion, "Requesting narrative");

        let response = self
            .build_request(prompt)
            .send()
            .await
            .map_err(GenerationError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = %status,
                body = %body,
                "Gemini API returned error"
            );
            return Err(GenerationError::from_status(status.as_u16(), body));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(GenerationError::from_transport)?;

        let text = parsed.into_text()?;
        debug!(chars = text.len(), "Narrative generated");

        Ok(NarrativeText::new(text))
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
