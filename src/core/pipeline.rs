//! Story pipeline orchestration
//!
//! Binds the classifier, narrative generator, speech synthesizer and artifact
//! store into the two user-facing operations:
//!
//! - [`StoryPipeline::detect_emotion`]: text to label, classifier only
//! - [`StoryPipeline::generate_story_and_audio`]: label to narrative and audio
//!   reference, run as `Generating -> Synthesizing -> Storing -> Done`
//!
//! Generation is all-or-nothing. A failure at any stage stops the run before
//! the next stage starts and no reference is returned, so nothing is written
//! unless a complete payload exists.

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::core::artifacts::{ArtifactRef, ArtifactStore, StorageError};
use crate::core::classifier::{ClassifierError, EmotionClassifier, EmotionLabel};
use crate::core::narrative::{GenerationError, NarrativeGenerator, NarrativeText};
use crate::core::retry::{RetryPolicy, Transient};
use crate::core::speech::{ModelId, SpeechSynthesizer, SynthesisError, VoiceId};

/// Errors surfaced by the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Classifier unavailable: {0}")]
    ModelLoad(String),

    #[error("Classification failed: {0}")]
    Inference(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Storage(StorageError),

    #[error("Audio not found: {0}")]
    NotFound(String),
}

impl PipelineError {
    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input_error",
            Self::ModelLoad(_) => "model_load_error",
            Self::Inference(_) => "inference_error",
            Self::Generation(_) => "generation_error",
            Self::Synthesis(_) => "synthesis_error",
            Self::Storage(_) => "storage_error",
            Self::NotFound(_) => "not_found",
        }
    }

    /// Whether the failure came from a transient upstream condition
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Generation(e) => e.is_transient(),
            Self::Synthesis(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<ClassifierError> for PipelineError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::InvalidInput(msg) => Self::Input(msg),
            ClassifierError::ModelLoad(msg) => Self::ModelLoad(msg),
            ClassifierError::Inference(msg) => Self::Inference(msg),
        }
    }
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(reference) => Self::NotFound(reference),
            other => Self::Storage(other),
        }
    }
}

/// Stage at which a generation run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Generation,
    Synthesis,
    Storage,
}

/// Progress of one generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    Generating,
    Synthesizing,
    Storing,
    Done,
    Failed(FailureKind),
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Whether `next` directly follows `self`
    pub fn can_transition_to(&self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        match (self, next) {
            (Start, Generating) | (Generating, Synthesizing) | (Synthesizing, Storing) => true,
            (Storing, Done) => true,
            (Generating, Failed(FailureKind::Generation))
            | (Synthesizing, Failed(FailureKind::Synthesis))
            | (Storing, Failed(FailureKind::Storage)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Generating => f.write_str("generating"),
            Self::Synthesizing => f.write_str("synthesizing"),
            Self::Storing => f.write_str("storing"),
            Self::Done => f.write_str("done"),
            Self::Failed(kind) => write!(f, "failed({kind:?})"),
        }
    }
}

/// Tracks and traces stage transitions of one run
struct StageTracker {
    stage: PipelineStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: PipelineStage::Start,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "invalid pipeline transition {} -> {}",
            self.stage,
            next
        );
        debug!(from = %self.stage, to = %next, "Pipeline stage transition");
        self.stage = next;
    }

    fn fail(&mut self, kind: FailureKind, err: PipelineError) -> PipelineError {
        // Reported at error level once, where the failure becomes a response
        warn!(stage = %self.stage, kind = err.kind(), error = %err, "Pipeline failed");
        self.advance(PipelineStage::Failed(kind));
        err
    }
}

/// Output of a successful generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryAudio {
    pub emotion: EmotionLabel,
    pub story: NarrativeText,
    pub reference: ArtifactRef,
}

/// Orchestrates the classify and generate operations.
#[derive(Clone)]
pub struct StoryPipeline {
    classifier: Arc<dyn EmotionClassifier>,
    generator: Arc<dyn NarrativeGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    store: Arc<dyn ArtifactStore>,
    voice: VoiceId,
    model: ModelId,
    retry: RetryPolicy,
}

impl StoryPipeline {
    pub fn new(
        classifier: Arc<dyn EmotionClassifier>,
        generator: Arc<dyn NarrativeGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        store: Arc<dyn ArtifactStore>,
        voice: VoiceId,
        model: ModelId,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            classifier,
            generator,
            synthesizer,
            store,
            voice,
            model,
            retry,
        }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn classifier_backend(&self) -> &'static str {
        self.classifier.backend_name()
    }

    /// Classify `text`. Inference runs on the blocking pool.
    pub async fn detect_emotion(&self, text: &str) -> Result<EmotionLabel, PipelineError> {
        let classifier = self.classifier.clone();
        let owned = text.to_owned();

        let label = tokio::task::spawn_blocking(move || classifier.classify(&owned))
            .await
            .map_err(|e| PipelineError::Inference(format!("classifier task failed: {e}")))??;

        debug!(emotion = %label, chars = text.len(), "Emotion detected");
        Ok(label)
    }

    /// Generate a narrative for `emotion`, synthesize it and store the audio.
    pub async fn generate_story_and_audio(
        &self,
        emotion: EmotionLabel,
    ) -> Result<StoryAudio, PipelineError> {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("generate_story", request_id = %request_id, emotion = %emotion);
        self.run_generation(emotion).instrument(span).await
    }

    async fn run_generation(&self, emotion: EmotionLabel) -> Result<StoryAudio, PipelineError> {
        let mut tracker = StageTracker::new();

        tracker.advance(PipelineStage::Generating);
        let story = self
            .retry
            .run(self.generator.provider_name(), || self.generator.generate(emotion))
            .await
            .map_err(|e| tracker.fail(FailureKind::Generation, e.into()))?;

        tracker.advance(PipelineStage::Synthesizing);
        let audio: Bytes = self
            .retry
            .run(self.synthesizer.provider_name(), || {
                self.synthesizer
                    .synthesize(story.as_str(), &self.voice, &self.model)
            })
            .await
            .map_err(|e| tracker.fail(FailureKind::Synthesis, e.into()))?;

        tracker.advance(PipelineStage::Storing);
        let size = audio.len();
        let reference = self
            .store
            .save(audio)
            .await
            .map_err(|e| tracker.fail(FailureKind::Storage, PipelineError::Storage(e)))?;

        tracker.advance(PipelineStage::Done);
        info!(
            reference = %reference,
            story_chars = story.as_str().len(),
            audio_bytes = size,
            "Story and audio generated"
        );

        Ok(StoryAudio {
            emotion,
            story,
            reference,
        })
    }

    /// Read a stored artifact. Unknown or expired references yield
    /// [`PipelineError::NotFound`].
    pub async fn open_audio(&self, reference: &ArtifactRef) -> Result<Bytes, PipelineError> {
        Ok(self.store.open(reference).await?)
    }
}
