//! Stub implementation for when the `classifier-onnx` feature is disabled

use super::config::ClassifierConfig;
use super::labels::LabelScores;
use super::{ClassifierError, ClassifierResult, EmotionClassifier};

/// Placeholder that refuses to load when the ONNX backend is compiled out
pub struct OnnxEmotionClassifier {
    config: ClassifierConfig,
}

impl OnnxEmotionClassifier {
    /// Always fails: the ONNX runtime is not compiled in
    pub async fn load(config: ClassifierConfig) -> ClassifierResult<Self> {
        let _ = config;
        Err(ClassifierError::ModelLoad(
            "emotion classifier requires the `classifier-onnx` feature. \
             Rebuild with `--features classifier-onnx`."
                .to_string(),
        ))
    }

    /// Get the classifier configuration
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn score(&self, _text: &str) -> ClassifierResult<LabelScores> {
        Err(ClassifierError::ModelLoad(
            "classifier-onnx feature disabled".to_string(),
        ))
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }
}
