//! ONNX Runtime backend for the emotion classifier

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use ort::session::Session;
use ort::session::builder::SessionBuilder;
use ort::value::{DynValue, Tensor};
use parking_lot::{Mutex, MutexGuard};
use tokenizers::{PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use super::assets;
use super::config::ClassifierConfig;
use super::labels::{LABEL_COUNT, LabelScores};
use super::{ClassifierError, ClassifierResult, EmotionClassifier};

/// Model inputs understood by this backend (BERT-style encoders)
const KNOWN_INPUTS: [&str; 3] = ["input_ids", "attention_mask", "token_type_ids"];

/// Token ids and masks for one input text, padded to the configured length
struct EncodedText {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

impl EncodedText {
    /// Tokenize `text`; the tokenizer's truncation and padding fix the length.
    fn encode(tokenizer: &Tokenizer, text: &str) -> ClassifierResult<Self> {
        let encoding = tokenizer
            .encode(text, true)
            .map_err(|e| ClassifierError::InvalidInput(e.to_string()))?;

        let widen = |ids: &[u32]| ids.iter().map(|&id| i64::from(id)).collect::<Vec<i64>>();

        Ok(Self {
            input_ids: widen(encoding.get_ids()),
            attention_mask: widen(encoding.get_attention_mask()),
            token_type_ids: widen(encoding.get_type_ids()),
        })
    }

    fn tensor_for(&self, input_name: &str) -> Option<&[i64]> {
        match input_name {
            "input_ids" => Some(&self.input_ids),
            "attention_mask" => Some(&self.attention_mask),
            "token_type_ids" => Some(&self.token_type_ids),
            _ => None,
        }
    }
}

/// Emotion classifier backed by an exported sequence-classification model.
///
/// Holds a small pool of sessions over the same read-only weights. A forward
/// pass takes the first idle session, so concurrent requests only queue when
/// every session is busy.
pub struct OnnxEmotionClassifier {
    sessions: Vec<Mutex<Session>>,
    next_session: AtomicUsize,
    tokenizer: Tokenizer,
    input_names: Vec<String>,
    output_name: String,
    config: ClassifierConfig,
}

impl OnnxEmotionClassifier {
    /// Load the tokenizer and model, then run one warm-up pass.
    ///
    /// Any failure here is a startup failure; the server must not start
    /// without a working classifier.
    pub async fn load(config: ClassifierConfig) -> ClassifierResult<Self> {
        let (model_path, tokenizer_path) =
            assets::resolve_paths(&config).map_err(|e| ClassifierError::ModelLoad(e.to_string()))?;

        info!(
            "Loading emotion classifier model={:?} tokenizer={:?} sessions={}",
            model_path,
            tokenizer_path,
            config.pool_size()
        );

        // Session creation parses the whole graph; keep it off the async workers
        tokio::task::spawn_blocking(move || Self::load_blocking(&model_path, &tokenizer_path, config))
            .await
            .map_err(|e| {
                ClassifierError::ModelLoad(format!("Classifier loading task failed: {e}"))
            })?
    }

    fn load_blocking(
        model_path: &Path,
        tokenizer_path: &Path,
        config: ClassifierConfig,
    ) -> ClassifierResult<Self> {
        let tokenizer = Self::load_tokenizer(tokenizer_path, config.max_sequence_length)?;

        let mut sessions = Vec::with_capacity(config.pool_size());
        for _ in 0..config.pool_size() {
            let session = Self::create_session(model_path, &config)
                .map_err(|e| ClassifierError::ModelLoad(e.to_string()))?;
            sessions.push(Mutex::new(session));
        }

        let (input_names, output_name) = Self::validate_model(&sessions[0].lock())?;
        info!("Classifier model inputs: {:?}", input_names);
        info!("Classifier model output: {}", output_name);

        let classifier = Self {
            sessions,
            next_session: AtomicUsize::new(0),
            tokenizer,
            input_names,
            output_name,
            config,
        };

        // Catches a wrong head width or incompatible graph before serving traffic
        classifier.score("warm up").map_err(|e| {
            ClassifierError::ModelLoad(format!("Model failed warm-up inference: {e}"))
        })?;

        Ok(classifier)
    }

    fn load_tokenizer(path: &Path, max_length: usize) -> ClassifierResult<Tokenizer> {
        let mut tokenizer = Tokenizer::from_file(path).map_err(|e| {
            ClassifierError::ModelLoad(format!("Failed to read tokenizer {path:?}: {e}"))
        })?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| ClassifierError::ModelLoad(format!("Invalid truncation settings: {e}")))?;

        // Keep the pad token/id shipped with the tokenizer, only force the length
        let mut padding = tokenizer.get_padding().cloned().unwrap_or_default();
        padding.strategy = PaddingStrategy::Fixed(max_length);
        tokenizer.with_padding(Some(padding));

        Ok(tokenizer)
    }

    fn create_session(model_path: &Path, config: &ClassifierConfig) -> ort::Result<Session> {
        let mut builder = SessionBuilder::new()?
            .with_optimization_level(config.graph_optimization_level.to_ort_level())?;

        if let Some(num_threads) = config.num_threads {
            builder = builder
                .with_intra_threads(num_threads)?
                .with_inter_threads(1)?;
        }

        builder.commit_from_file(model_path)
    }

    fn validate_model(session: &Session) -> ClassifierResult<(Vec<String>, String)> {
        let input_names: Vec<String> = session
            .inputs
            .iter()
            .map(|input| input.name.clone())
            .collect();

        for (i, input) in session.inputs.iter().enumerate() {
            debug!("  Input {}: {} ({:?})", i, input.name, input.input_type);
        }

        if !input_names.iter().any(|name| name == "input_ids") {
            return Err(ClassifierError::ModelLoad(format!(
                "Model has no `input_ids` input (found {input_names:?})"
            )));
        }

        if let Some(unknown) = input_names
            .iter()
            .find(|name| !KNOWN_INPUTS.contains(&name.as_str()))
        {
            return Err(ClassifierError::ModelLoad(format!(
                "Model input `{unknown}` is not supported; expected a subset of {KNOWN_INPUTS:?}"
            )));
        }

        // Prefer the conventional name, otherwise the first output holds the logits
        let output_name = session
            .outputs
            .iter()
            .find(|output| output.name == "logits")
            .or_else(|| session.outputs.first())
            .map(|output| output.name.clone())
            .ok_or_else(|| ClassifierError::ModelLoad("Model declares no outputs".to_string()))?;

        if session.outputs.len() > 1 {
            warn!(
                "Classifier model has {} outputs, reading logits from `{}`",
                session.outputs.len(),
                output_name
            );
        }

        Ok((input_names, output_name))
    }

    /// Take the first idle session, or wait on the round-robin pick.
    fn acquire_session(&self) -> MutexGuard<'_, Session> {
        let count = self.sessions.len();
        let start = self.next_session.fetch_add(1, Ordering::Relaxed) % count;
        for offset in 0..count {
            if let Some(guard) = self.sessions[(start + offset) % count].try_lock() {
                return guard;
            }
        }
        self.sessions[start].lock()
    }

    /// Get the classifier configuration
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn score(&self, text: &str) -> ClassifierResult<LabelScores> {
        let encoded = EncodedText::encode(&self.tokenizer, text)?;
        let shape = [1usize, encoded.input_ids.len()];

        let mut inputs: Vec<(&str, DynValue)> = Vec::with_capacity(self.input_names.len());
        for name in &self.input_names {
            let data = encoded.tensor_for(name).ok_or_else(|| {
                ClassifierError::Inference(format!("No tensor for model input `{name}`"))
            })?;
            let tensor = Tensor::from_array((shape, data.to_vec()))
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;
            inputs.push((name.as_str(), tensor.into_dyn()));
        }

        let mut session = self.acquire_session();
        let outputs = session
            .run(inputs)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let (_shape, logits) = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| {
                ClassifierError::Inference(format!("Missing model output `{}`", self.output_name))
            })?
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        if logits.len() != LABEL_COUNT {
            return Err(ClassifierError::Inference(format!(
                "Expected {LABEL_COUNT} logits, model produced {}",
                logits.len()
            )));
        }

        let mut scores = [0.0f32; LABEL_COUNT];
        scores.copy_from_slice(logits);
        debug!("Classifier logits: {:?}", scores);

        Ok(scores)
    }

    fn backend_name(&self) -> &'static str {
        "onnx"
    }
}
