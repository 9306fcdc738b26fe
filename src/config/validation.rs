//! Configuration validation logic

use super::env::TlsSettings;
use super::{ServerConfig, TlsConfig};
use crate::core::artifacts::ArtifactBackend;
use crate::core::narrative::EMOTION_PLACEHOLDER;

/// Shortest and longest accepted classifier sequence length
const MIN_SEQUENCE_LENGTH: usize = 2;
const MAX_SEQUENCE_LENGTH: usize = 512;

/// Turn raw TLS settings into a [`TlsConfig`].
///
/// TLS is on when explicitly enabled, or when both paths are given and it is
/// not explicitly disabled.
pub(super) fn resolve_tls(tls: &TlsSettings) -> Result<Option<TlsConfig>, String> {
    let enabled = tls
        .enabled
        .unwrap_or(tls.cert_path.is_some() && tls.key_path.is_some());
    if !enabled {
        return Ok(None);
    }

    match (&tls.cert_path, &tls.key_path) {
        (Some(cert_path), Some(key_path)) => Ok(Some(TlsConfig {
            cert_path: cert_path.clone(),
            key_path: key_path.clone(),
        })),
        _ => Err(
            "TLS is enabled but TLS_CERT_PATH and TLS_KEY_PATH are not both set".to_string(),
        ),
    }
}

/// Validate a merged configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), String> {
    validate_classifier(config)?;
    validate_prompt_template(config)?;
    validate_retry(config)?;
    validate_base_url("GEMINI_BASE_URL", &config.generation.base_url)?;
    validate_base_url("ELEVENLABS_BASE_URL", &config.synthesis.base_url)?;
    validate_artifacts(config)?;
    Ok(())
}

fn validate_classifier(config: &ServerConfig) -> Result<(), String> {
    let len = config.classifier.max_sequence_length;
    if !(MIN_SEQUENCE_LENGTH..=MAX_SEQUENCE_LENGTH).contains(&len) {
        return Err(format!(
            "CLASSIFIER_MAX_SEQUENCE_LENGTH must be between {MIN_SEQUENCE_LENGTH} and {MAX_SEQUENCE_LENGTH}, got {len}"
        ));
    }
    Ok(())
}

fn validate_prompt_template(config: &ServerConfig) -> Result<(), String> {
    if !config.generation.prompt_template.has_placeholder() {
        return Err(format!(
            "STORY_PROMPT_TEMPLATE must contain the {EMOTION_PLACEHOLDER} placeholder"
        ));
    }
    Ok(())
}

fn validate_retry(config: &ServerConfig) -> Result<(), String> {
    if config.retry.max_attempts == 0 {
        return Err("RETRY_MAX_ATTEMPTS must be at least 1".to_string());
    }
    if config.retry.backoff_multiplier < 1.0 {
        return Err("RETRY_BACKOFF_MULTIPLIER must be at least 1.0".to_string());
    }
    Ok(())
}

fn validate_base_url(name: &str, raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("Invalid {name} {raw:?}: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "Invalid {name} {raw:?}: scheme must be http or https, got {other}"
        )),
    }
}

fn validate_artifacts(config: &ServerConfig) -> Result<(), String> {
    if config.artifacts.backend == ArtifactBackend::S3 {
        let has_bucket = config
            .artifacts
            .s3
            .as_ref()
            .is_some_and(|s3| !s3.bucket.trim().is_empty());
        if !has_bucket {
            return Err("ARTIFACT_S3_BUCKET is required when ARTIFACT_BACKEND=s3".to_string());
        }
    }
    Ok(())
}
