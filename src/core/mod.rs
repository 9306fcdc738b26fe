pub mod artifacts;
pub mod classifier;
pub mod narrative;
pub mod pipeline;
pub mod retry;
pub mod speech;

// Re-export commonly used types for convenience
pub use artifacts::{
    ArtifactBackend, ArtifactConfig, ArtifactRef, ArtifactStore, FilesystemArtifactStore,
    MemoryArtifactStore, ObjectArtifactStore, StorageError, StorageResult, create_artifact_store,
};

pub use classifier::{
    ClassifierConfig, ClassifierError, ClassifierResult, EMOTION_LABELS, EmotionClassifier,
    EmotionLabel, OnnxEmotionClassifier,
};

pub use narrative::{
    GeminiNarrativeGenerator, GenerationConfig, GenerationError, GenerationResult,
    NarrativeGenerator, NarrativeText, PromptTemplate,
};

pub use pipeline::{PipelineError, PipelineStage, StoryAudio, StoryPipeline};

pub use retry::{RetryPolicy, Transient};

pub use speech::{
    ElevenLabsSynthesizer, ModelId, SpeechSynthesizer, SynthesisConfig, SynthesisError,
    SynthesisResult, VoiceId,
};
