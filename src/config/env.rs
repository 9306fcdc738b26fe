//! Environment variable loading.
//!
//! Every option has a default, so an empty environment yields a runnable
//! configuration (apart from the provider credentials).

use std::path::PathBuf;
use std::str::FromStr;

use super::ServerConfig;
use crate::core::artifacts::{ArtifactBackend, S3ArtifactConfig};
use crate::core::narrative::PromptTemplate;

/// Every environment variable the gateway reads
pub(crate) const ENV_VARS: &[&str] = &[
    "HOST",
    "PORT",
    "TLS_ENABLED",
    "TLS_CERT_PATH",
    "TLS_KEY_PATH",
    "CORS_ALLOWED_ORIGINS",
    "RATE_LIMIT_REQUESTS_PER_SECOND",
    "RATE_LIMIT_BURST_SIZE",
    "CLASSIFIER_MODEL_PATH",
    "CLASSIFIER_TOKENIZER_PATH",
    "CLASSIFIER_MAX_SEQUENCE_LENGTH",
    "CLASSIFIER_SESSION_POOL_SIZE",
    "CLASSIFIER_NUM_THREADS",
    "CLASSIFIER_MODEL_URL",
    "CLASSIFIER_TOKENIZER_URL",
    "GEMINI_API_KEY",
    "GEMINI_MODEL",
    "GEMINI_BASE_URL",
    "STORY_PROMPT_TEMPLATE",
    "GENERATION_TIMEOUT_SECONDS",
    "ELEVENLABS_API_KEY",
    "ELEVENLABS_VOICE_ID",
    "ELEVENLABS_MODEL_ID",
    "ELEVENLABS_OUTPUT_FORMAT",
    "ELEVENLABS_BASE_URL",
    "SYNTHESIS_TIMEOUT_SECONDS",
    "ELEVENLABS_STABILITY",
    "ELEVENLABS_SIMILARITY_BOOST",
    "RETRY_MAX_ATTEMPTS",
    "RETRY_INITIAL_DELAY_MS",
    "RETRY_MAX_DELAY_MS",
    "RETRY_BACKOFF_MULTIPLIER",
    "ARTIFACT_BACKEND",
    "ARTIFACT_DIR",
    "ARTIFACT_TTL_SECONDS",
    "ARTIFACT_SWEEP_INTERVAL_SECONDS",
    "ARTIFACT_MAX_MEMORY_BYTES",
    "ARTIFACT_S3_BUCKET",
    "ARTIFACT_S3_REGION",
    "ARTIFACT_S3_ENDPOINT",
    "ARTIFACT_S3_ACCESS_KEY",
    "ARTIFACT_S3_SECRET_KEY",
    "ARTIFACT_S3_PREFIX",
];

/// TLS settings before validation
#[derive(Debug, Clone, Default)]
pub(super) struct TlsSettings {
    pub enabled: Option<bool>,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
}

/// Read a non-empty environment variable
fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an environment variable
fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("Invalid value for {name}: {raw:?}")),
        None => Ok(None),
    }
}

/// Parse a boolean flag ("true"/"false", "1"/"0", "yes"/"no")
pub(super) fn parse_bool(name: &str, raw: &str) -> Result<bool, String> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(format!("Invalid boolean for {name}: {raw:?}")),
    }
}

/// Build a configuration from defaults overridden by environment variables.
pub(super) fn load_from_env() -> Result<(ServerConfig, TlsSettings), String> {
    let mut config = ServerConfig::default();

    // Server
    if let Some(host) = env_string("HOST") {
        config.host = host;
    }
    if let Some(port) = env_parse("PORT")? {
        config.port = port;
    }
    let tls = TlsSettings {
        enabled: env_string("TLS_ENABLED")
            .map(|raw| parse_bool("TLS_ENABLED", &raw))
            .transpose()?,
        cert_path: env_string("TLS_CERT_PATH").map(PathBuf::from),
        key_path: env_string("TLS_KEY_PATH").map(PathBuf::from),
    };

    // Security
    config.cors_allowed_origins = env_string("CORS_ALLOWED_ORIGINS");
    if let Some(rps) = env_parse("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = env_parse("RATE_LIMIT_BURST_SIZE")? {
        config.rate_limit_burst_size = burst;
    }

    // Classifier
    let classifier = &mut config.classifier;
    if let Some(path) = env_string("CLASSIFIER_MODEL_PATH") {
        classifier.model_path = PathBuf::from(path);
    }
    if let Some(path) = env_string("CLASSIFIER_TOKENIZER_PATH") {
        classifier.tokenizer_path = PathBuf::from(path);
    }
    if let Some(len) = env_parse("CLASSIFIER_MAX_SEQUENCE_LENGTH")? {
        classifier.max_sequence_length = len;
    }
    if let Some(size) = env_parse("CLASSIFIER_SESSION_POOL_SIZE")? {
        classifier.session_pool_size = size;
    }
    if let Some(threads) = env_parse("CLASSIFIER_NUM_THREADS")? {
        classifier.num_threads = Some(threads);
    }
    if let Some(url) = env_string("CLASSIFIER_MODEL_URL") {
        classifier.model_url = Some(url);
    }
    if let Some(url) = env_string("CLASSIFIER_TOKENIZER_URL") {
        classifier.tokenizer_url = Some(url);
    }

    // Generation
    let generation = &mut config.generation;
    if let Some(key) = env_string("GEMINI_API_KEY") {
        generation.api_key = key;
    }
    if let Some(model) = env_string("GEMINI_MODEL") {
        generation.model = model;
    }
    if let Some(url) = env_string("GEMINI_BASE_URL") {
        generation.base_url = url;
    }
    if let Some(template) = env_string("STORY_PROMPT_TEMPLATE") {
        generation.prompt_template = PromptTemplate::new(template);
    }
    if let Some(timeout) = env_parse("GENERATION_TIMEOUT_SECONDS")? {
        generation.timeout_seconds = timeout;
    }

    // Synthesis
    let synthesis = &mut config.synthesis;
    if let Some(key) = env_string("ELEVENLABS_API_KEY") {
        synthesis.api_key = key;
    }
    if let Some(voice) = env_string("ELEVENLABS_VOICE_ID") {
        synthesis.voice_id = voice;
    }
    if let Some(model) = env_string("ELEVENLABS_MODEL_ID") {
        synthesis.model_id = model;
    }
    if let Some(format) = env_string("ELEVENLABS_OUTPUT_FORMAT") {
        synthesis.output_format = format;
    }
    if let Some(url) = env_string("ELEVENLABS_BASE_URL") {
        synthesis.base_url = url;
    }
    if let Some(timeout) = env_parse("SYNTHESIS_TIMEOUT_SECONDS")? {
        synthesis.timeout_seconds = timeout;
    }
    if let Some(stability) = env_parse("ELEVENLABS_STABILITY")? {
        synthesis.stability = Some(stability);
    }
    if let Some(similarity) = env_parse("ELEVENLABS_SIMILARITY_BOOST")? {
        synthesis.similarity_boost = Some(similarity);
    }

    // Retry
    let retry = &mut config.retry;
    if let Some(attempts) = env_parse("RETRY_MAX_ATTEMPTS")? {
        retry.max_attempts = attempts;
    }
    if let Some(delay) = env_parse("RETRY_INITIAL_DELAY_MS")? {
        retry.initial_delay_ms = delay;
    }
    if let Some(delay) = env_parse("RETRY_MAX_DELAY_MS")? {
        retry.max_delay_ms = delay;
    }
    if let Some(multiplier) = env_parse("RETRY_BACKOFF_MULTIPLIER")? {
        retry.backoff_multiplier = multiplier;
    }

    // Artifacts
    let artifacts = &mut config.artifacts;
    if let Some(raw) = env_string("ARTIFACT_BACKEND") {
        artifacts.backend = ArtifactBackend::parse(&raw)
            .ok_or_else(|| format!("Invalid value for ARTIFACT_BACKEND: {raw:?}"))?;
    }
    if let Some(dir) = env_string("ARTIFACT_DIR") {
        artifacts.dir = PathBuf::from(dir);
    }
    if let Some(ttl) = env_parse("ARTIFACT_TTL_SECONDS")? {
        artifacts.ttl_seconds = ttl;
    }
    if let Some(interval) = env_parse("ARTIFACT_SWEEP_INTERVAL_SECONDS")? {
        artifacts.sweep_interval_seconds = interval;
    }
    if let Some(bytes) = env_parse("ARTIFACT_MAX_MEMORY_BYTES")? {
        artifacts.max_memory_bytes = bytes;
    }
    if let Some(bucket) = env_string("ARTIFACT_S3_BUCKET") {
        artifacts.s3 = Some(S3ArtifactConfig {
            bucket,
            region: env_string("ARTIFACT_S3_REGION"),
            endpoint: env_string("ARTIFACT_S3_ENDPOINT"),
            access_key: env_string("ARTIFACT_S3_ACCESS_KEY"),
            secret_key: env_string("ARTIFACT_S3_SECRET_KEY"),
            prefix: env_string("ARTIFACT_S3_PREFIX"),
        });
    }

    Ok((config, tls))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn cleanup_env_vars() {
        unsafe {
            for name in ENV_VARS {
                env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", " YES ").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_env_overrides() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "8081");
            env::set_var("TLS_ENABLED", "true");
            env::set_var("TLS_CERT_PATH", "/certs/cert.pem");
            env::set_var("CLASSIFIER_MAX_SEQUENCE_LENGTH", "256");
            env::set_var("CLASSIFIER_NUM_THREADS", "4");
            env::set_var("GEMINI_API_KEY", "gemini-key");
            env::set_var("STORY_PROMPT_TEMPLATE", "Tell me about {emotion}");
            env::set_var("ELEVENLABS_STABILITY", "0.3");
            env::set_var("RETRY_MAX_ATTEMPTS", "5");
            env::set_var("ARTIFACT_BACKEND", "s3");
            env::set_var("ARTIFACT_S3_BUCKET", "stories");
            env::set_var("ARTIFACT_S3_PREFIX", "audio");
        }

        let (config, tls) = load_from_env().unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(tls.enabled, Some(true));
        assert_eq!(tls.cert_path, Some(PathBuf::from("/certs/cert.pem")));
        assert!(tls.key_path.is_none());
        assert_eq!(config.classifier.max_sequence_length, 256);
        assert_eq!(config.classifier.num_threads, Some(4));
        assert_eq!(config.generation.api_key, "gemini-key");
        assert_eq!(
            config.generation.prompt_template.as_str(),
            "Tell me about {emotion}"
        );
        assert_eq!(config.synthesis.stability, Some(0.3));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.artifacts.backend, ArtifactBackend::S3);
        let s3 = config.artifacts.s3.as_ref().unwrap();
        assert_eq!(s3.bucket, "stories");
        assert_eq!(s3.prefix.as_deref(), Some("audio"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_backend_is_rejected() {
        cleanup_env_vars();
        unsafe {
            env::set_var("ARTIFACT_BACKEND", "redis");
        }

        let err = load_from_env().unwrap_err();
        assert!(err.contains("ARTIFACT_BACKEND"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_empty_values_are_ignored() {
        cleanup_env_vars();
        unsafe {
            env::set_var("HOST", "  ");
        }

        let (config, _) = load_from_env().unwrap();
        assert_eq!(config.host, "0.0.0.0");

        cleanup_env_vars();
    }
}
