//! Configuration types for narrative generation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::classifier::EmotionLabel;

/// Placeholder replaced by the emotion name when rendering a prompt
pub const EMOTION_PLACEHOLDER: &str = "{emotion}";

/// Default story prompt
pub const DEFAULT_STORY_PROMPT: &str = "Create a short, engaging story that reflects the emotion of {emotion}. \
The story should be uplifting and meaningful, helping the reader process and understand this emotion. \
Make it around 4-5 sentences long, with a positive message or lesson at the end. \
Keep the tone appropriate for all ages.";

/// Prompt template with an `{emotion}` placeholder.
///
/// # Example
///
/// ```rust
/// use emotale_gateway::core::classifier::EmotionLabel;
/// use emotale_gateway::core::narrative::PromptTemplate;
///
/// let template = PromptTemplate::new("Tell a story about {emotion}.");
/// assert_eq!(template.render(EmotionLabel::Joy), "Tell a story about joy.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Substitute every placeholder with the emotion name.
    pub fn render(&self, emotion: EmotionLabel) -> String {
        self.0.replace(EMOTION_PLACEHOLDER, emotion.as_str())
    }

    /// Whether the template references the emotion at all
    pub fn has_placeholder(&self) -> bool {
        self.0.contains(EMOTION_PLACEHOLDER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self(DEFAULT_STORY_PROMPT.to_string())
    }
}

/// Configuration for the Gemini narrative generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Gemini API key
    pub api_key: String,

    /// Model name, e.g. `gemini-2.0-flash`
    pub model: String,

    /// API root, overridable for proxies and tests
    pub base_url: String,

    /// Story prompt
    pub prompt_template: PromptTemplate,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
            base_url: super::GEMINI_API_URL.to_string(),
            prompt_template: PromptTemplate::default(),
            timeout_seconds: 30,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }
}
