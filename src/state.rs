//! Shared application state

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::artifacts::{ArtifactStore, create_artifact_store, spawn_sweeper};
use crate::core::classifier::{EmotionClassifier, OnnxEmotionClassifier};
use crate::core::narrative::{GeminiNarrativeGenerator, NarrativeGenerator};
use crate::core::pipeline::{PipelineError, StoryPipeline};
use crate::core::speech::{ElevenLabsSynthesizer, SpeechSynthesizer};

/// State shared by every request handler
pub struct AppState {
    pub pipeline: StoryPipeline,
    sweeper: Option<JoinHandle<()>>,
}

impl AppState {
    /// Build the production state from configuration.
    ///
    /// Loads the classifier (a failure here is fatal), creates the Gemini and
    /// ElevenLabs clients and the artifact store, and starts the artifact
    /// sweeper.
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, PipelineError> {
        let classifier: Arc<dyn EmotionClassifier> =
            Arc::new(OnnxEmotionClassifier::load(config.classifier.clone()).await?);
        let generator: Arc<dyn NarrativeGenerator> =
            Arc::new(GeminiNarrativeGenerator::new(&config.generation)?);
        let synthesizer: Arc<dyn SpeechSynthesizer> =
            Arc::new(ElevenLabsSynthesizer::new(&config.synthesis)?);
        let store = create_artifact_store(&config.artifacts).map_err(PipelineError::Storage)?;

        let pipeline = StoryPipeline::new(
            classifier,
            generator,
            synthesizer,
            store.clone(),
            config.synthesis.voice(),
            config.synthesis.model(),
            config.retry.clone(),
        );

        let sweeper = spawn_sweeper(store, config.artifacts.sweep_interval());
        info!(
            classifier = pipeline.classifier_backend(),
            sweep_interval_seconds = config.artifacts.sweep_interval_seconds,
            "Application state ready"
        );

        Ok(Arc::new(Self {
            pipeline,
            sweeper: Some(sweeper),
        }))
    }

    /// Build state around an existing pipeline, without a sweeper.
    pub fn from_pipeline(pipeline: StoryPipeline) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            sweeper: None,
        })
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        self.pipeline.store()
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}
