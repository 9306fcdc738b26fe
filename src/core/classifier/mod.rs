//! Text emotion classification
//!
//! This module maps free-form text to one [`EmotionLabel`] using a frozen
//! sequence-classification model. The model is loaded once at startup and is
//! read-only afterwards, so a single classifier instance is shared by every
//! request.
//!
//! # Feature Flag
//!
//! The ONNX backend requires the `classifier-onnx` feature. When disabled,
//! [`OnnxEmotionClassifier::load`] always fails, which aborts server startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use emotale_gateway::core::classifier::{ClassifierConfig, EmotionClassifier, OnnxEmotionClassifier};
//!
//! let classifier = OnnxEmotionClassifier::load(ClassifierConfig::default()).await?;
//! let label = classifier.classify("I just got promoted!")?;
//! println!("{label}");
//! ```

pub mod assets;
pub mod config;
mod labels;
#[cfg(feature = "classifier-onnx")]
mod onnx;
#[cfg(not(feature = "classifier-onnx"))]
mod stub;

pub use config::{ClassifierConfig, DEFAULT_MAX_SEQUENCE_LENGTH, GraphOptimizationLevel};
pub use labels::{EMOTION_LABELS, EmotionLabel, LABEL_COUNT, LabelScores, select_label};

#[cfg(feature = "classifier-onnx")]
pub use onnx::OnnxEmotionClassifier;
#[cfg(not(feature = "classifier-onnx"))]
pub use stub::OnnxEmotionClassifier;

use thiserror::Error;

/// Errors raised by an emotion classifier
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The text could not be tokenized
    #[error("Failed to tokenize input: {0}")]
    InvalidInput(String),

    /// The model or tokenizer could not be loaded
    #[error("Failed to load classifier: {0}")]
    ModelLoad(String),

    /// The forward pass failed or produced an unexpected output
    #[error("Classifier inference failed: {0}")]
    Inference(String),
}

/// Result type for classifier operations
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// A frozen text classifier producing one score per [`EmotionLabel`].
///
/// Implementations only provide [`score`](EmotionClassifier::score); the
/// label selection rules live in the provided [`classify`](EmotionClassifier::classify)
/// so every backend resolves ties and empty input the same way.
///
/// Calls are CPU-bound and synchronous. Async callers should run them on the
/// blocking pool.
pub trait EmotionClassifier: Send + Sync {
    /// Run one inference pass and return the logits in [`EMOTION_LABELS`] order.
    fn score(&self, text: &str) -> ClassifierResult<LabelScores>;

    /// Classify `text` into exactly one label.
    ///
    /// Empty or whitespace-only text resolves to [`EmotionLabel::Neutral`]
    /// without running the model.
    fn classify(&self, text: &str) -> ClassifierResult<EmotionLabel> {
        if text.trim().is_empty() {
            return Ok(EmotionLabel::Neutral);
        }
        let scores = self.score(text)?;
        Ok(select_label(&scores))
    }

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores text by its length so different inputs land on different labels.
    struct LengthClassifier {
        calls: AtomicUsize,
    }

    impl EmotionClassifier for LengthClassifier {
        fn score(&self, text: &str) -> ClassifierResult<LabelScores> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut scores = [0.0; LABEL_COUNT];
            scores[text.len() % LABEL_COUNT] = 1.0;
            Ok(scores)
        }

        fn backend_name(&self) -> &'static str {
            "length"
        }
    }

    struct FailingClassifier;

    impl EmotionClassifier for FailingClassifier {
        fn score(&self, _text: &str) -> ClassifierResult<LabelScores> {
            Err(ClassifierError::InvalidInput("bad bytes".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_empty_text_is_neutral_without_inference() {
        let classifier = LengthClassifier {
            calls: AtomicUsize::new(0),
        };
        for _ in 0..3 {
            assert_eq!(classifier.classify("").unwrap(), EmotionLabel::Neutral);
            assert_eq!(classifier.classify("  \n\t").unwrap(), EmotionLabel::Neutral);
        }
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let classifier = LengthClassifier {
            calls: AtomicUsize::new(0),
        };
        let first = classifier.classify("I just got promoted!").unwrap();
        let second = classifier.classify("I just got promoted!").unwrap();
        assert_eq!(first, second);
        assert!(EMOTION_LABELS.contains(&first));
    }

    #[test]
    fn test_score_error_propagates() {
        let err = FailingClassifier.classify("text").unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidInput(_)));
    }
}
