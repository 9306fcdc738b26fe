//! Emotion classifier configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default maximum sequence length fed to the model (tokens, including special tokens)
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 128;

/// ONNX graph optimization level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GraphOptimizationLevel {
    /// No graph optimizations
    Disabled,
    /// Basic optimizations (constant folding, redundant node elimination)
    Level1,
    /// Extended optimizations (node fusions)
    Level2,
    /// All optimizations including layout changes
    #[default]
    Level3,
}

#[cfg(feature = "classifier-onnx")]
impl GraphOptimizationLevel {
    /// Convert to the ort optimization level
    pub fn to_ort_level(self) -> ort::session::builder::GraphOptimizationLevel {
        use ort::session::builder::GraphOptimizationLevel as Ort;
        match self {
            Self::Disabled => Ort::Disable,
            Self::Level1 => Ort::Level1,
            Self::Level2 => Ort::Level2,
            Self::Level3 => Ort::Level3,
        }
    }
}

/// Configuration for the local emotion classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Path to the exported sequence-classification model (ONNX)
    pub model_path: PathBuf,

    /// Path to the HuggingFace `tokenizer.json` matching the model
    pub tokenizer_path: PathBuf,

    /// Inputs are truncated and padded to this many tokens
    pub max_sequence_length: usize,

    /// Number of ONNX sessions kept for concurrent inference
    pub session_pool_size: usize,

    /// Intra-op threads per session
    pub num_threads: Option<usize>,

    /// ONNX graph optimization level
    pub graph_optimization_level: GraphOptimizationLevel,

    /// Where `init` downloads the model from when it is missing locally
    pub model_url: Option<String>,

    /// Where `init` downloads the tokenizer from when it is missing locally
    pub tokenizer_url: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./text_emotion_model/model.onnx"),
            tokenizer_path: PathBuf::from("./text_emotion_model/tokenizer.json"),
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            session_pool_size: 2,
            num_threads: Some(1),
            graph_optimization_level: GraphOptimizationLevel::Level3,
            model_url: None,
            tokenizer_url: None,
        }
    }
}

impl ClassifierConfig {
    /// Session pool size, never zero
    pub fn pool_size(&self) -> usize {
        self.session_pool_size.max(1)
    }
}
