//! Applying YAML overrides on top of the environment configuration.

use std::path::PathBuf;

use super::ServerConfig;
use super::env::{TlsSettings, load_from_env};
use super::validation::resolve_tls;
use super::yaml::YamlConfig;
use crate::core::artifacts::{ArtifactBackend, S3ArtifactConfig};
use crate::core::narrative::PromptTemplate;

/// Overwrite `target` when `value` is present
fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Merge environment variables (base) with optional YAML overrides.
pub(super) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, String> {
    let (mut config, mut tls) = load_from_env()?;

    if let Some(yaml) = yaml {
        apply_yaml(&mut config, &mut tls, yaml)?;
    }

    config.tls = resolve_tls(&tls)?;
    Ok(config)
}

fn apply_yaml(
    config: &mut ServerConfig,
    tls: &mut TlsSettings,
    yaml: YamlConfig,
) -> Result<(), String> {
    if let Some(server) = yaml.server {
        set(&mut config.host, server.host);
        set(&mut config.port, server.port);
        if let Some(tls_yaml) = server.tls {
            if tls_yaml.enabled.is_some() {
                tls.enabled = tls_yaml.enabled;
            }
            if let Some(cert) = tls_yaml.cert_path {
                tls.cert_path = Some(PathBuf::from(cert));
            }
            if let Some(key) = tls_yaml.key_path {
                tls.key_path = Some(PathBuf::from(key));
            }
        }
    }

    if let Some(security) = yaml.security {
        if security.cors_allowed_origins.is_some() {
            config.cors_allowed_origins = security.cors_allowed_origins;
        }
        set(
            &mut config.rate_limit_requests_per_second,
            security.rate_limit_requests_per_second,
        );
        set(
            &mut config.rate_limit_burst_size,
            security.rate_limit_burst_size,
        );
    }

    if let Some(classifier) = yaml.classifier {
        let target = &mut config.classifier;
        set(&mut target.model_path, classifier.model_path.map(PathBuf::from));
        set(
            &mut target.tokenizer_path,
            classifier.tokenizer_path.map(PathBuf::from),
        );
        set(
            &mut target.max_sequence_length,
            classifier.max_sequence_length,
        );
        set(&mut target.session_pool_size, classifier.session_pool_size);
        if classifier.num_threads.is_some() {
            target.num_threads = classifier.num_threads;
        }
        if classifier.model_url.is_some() {
            target.model_url = classifier.model_url;
        }
        if classifier.tokenizer_url.is_some() {
            target.tokenizer_url = classifier.tokenizer_url;
        }
    }

    if let Some(generation) = yaml.generation {
        let target = &mut config.generation;
        set(&mut target.api_key, generation.api_key);
        set(&mut target.model, generation.model);
        set(&mut target.base_url, generation.base_url);
        set(
            &mut target.prompt_template,
            generation.prompt_template.map(PromptTemplate::new),
        );
        set(&mut target.timeout_seconds, generation.timeout_seconds);
    }

    if let Some(synthesis) = yaml.synthesis {
        let target = &mut config.synthesis;
        set(&mut target.api_key, synthesis.api_key);
        set(&mut target.voice_id, synthesis.voice_id);
        set(&mut target.model_id, synthesis.model_id);
        set(&mut target.output_format, synthesis.output_format);
        set(&mut target.base_url, synthesis.base_url);
        set(&mut target.timeout_seconds, synthesis.timeout_seconds);
        if synthesis.stability.is_some() {
            target.stability = synthesis.stability;
        }
        if synthesis.similarity_boost.is_some() {
            target.similarity_boost = synthesis.similarity_boost;
        }
    }

    if let Some(retry) = yaml.retry {
        let target = &mut config.retry;
        set(&mut target.max_attempts, retry.max_attempts);
        set(&mut target.initial_delay_ms, retry.initial_delay_ms);
        set(&mut target.max_delay_ms, retry.max_delay_ms);
        set(&mut target.backoff_multiplier, retry.backoff_multiplier);
    }

    if let Some(artifacts) = yaml.artifacts {
        let target = &mut config.artifacts;
        if let Some(raw) = artifacts.backend {
            target.backend = ArtifactBackend::parse(&raw)
                .ok_or_else(|| format!("Invalid artifacts.backend: {raw:?}"))?;
        }
        set(&mut target.dir, artifacts.dir.map(PathBuf::from));
        set(&mut target.ttl_seconds, artifacts.ttl_seconds);
        set(
            &mut target.sweep_interval_seconds,
            artifacts.sweep_interval_seconds,
        );
        set(&mut target.max_memory_bytes, artifacts.max_memory_bytes);

        if let Some(s3_yaml) = artifacts.s3 {
            let s3 = target.s3.get_or_insert_with(S3ArtifactConfig::default);
            set(&mut s3.bucket, s3_yaml.bucket);
            if s3_yaml.region.is_some() {
                s3.region = s3_yaml.region;
            }
            if s3_yaml.endpoint.is_some() {
                s3.endpoint = s3_yaml.endpoint;
            }
            if s3_yaml.access_key.is_some() {
                s3.access_key = s3_yaml.access_key;
            }
            if s3_yaml.secret_key.is_some() {
                s3.secret_key = s3_yaml.secret_key;
            }
            if s3_yaml.prefix.is_some() {
                s3.prefix = s3_yaml.prefix;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn cleanup_env_vars() {
        unsafe {
            for name in super::super::env::ENV_VARS {
                env::remove_var(name);
            }
        }
    }

    #[test]
    #[serial]
    fn test_merge_without_yaml_uses_env() {
        cleanup_env_vars();
        unsafe {
            env::set_var("GEMINI_MODEL", "gemini-env");
        }

        let config = merge_config(None).unwrap();
        assert_eq!(config.generation.model, "gemini-env");
        assert!(config.tls.is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_yaml_s3_section_extends_env_bucket() {
        cleanup_env_vars();
        unsafe {
            env::set_var("ARTIFACT_S3_BUCKET", "env-bucket");
            env::set_var("ARTIFACT_S3_REGION", "eu-west-1");
        }

        let yaml: YamlConfig = serde_yaml::from_str(
            r#"
artifacts:
  backend: s3
  s3:
    prefix: "stories"
"#,
        )
        .unwrap();

        let config = merge_config(Some(yaml)).unwrap();
        let s3 = config.artifacts.s3.as_ref().unwrap();
        assert_eq!(config.artifacts.backend, ArtifactBackend::S3);
        assert_eq!(s3.bucket, "env-bucket");
        assert_eq!(s3.region.as_deref(), Some("eu-west-1"));
        assert_eq!(s3.prefix.as_deref(), Some("stories"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_yaml_enables_tls_with_env_paths() {
        cleanup_env_vars();
        unsafe {
            env::set_var("TLS_CERT_PATH", "/certs/cert.pem");
            env::set_var("TLS_KEY_PATH", "/certs/key.pem");
        }

        let yaml: YamlConfig = serde_yaml::from_str(
            r#"
server:
  tls:
    enabled: true
"#,
        )
        .unwrap();

        let config = merge_config(Some(yaml)).unwrap();
        let tls = config.tls.as_ref().unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("/certs/cert.pem"));
        assert_eq!(tls.key_path, PathBuf::from("/certs/key.pem"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_yaml_backend() {
        cleanup_env_vars();

        let yaml: YamlConfig = serde_yaml::from_str("artifacts:\n  backend: tape\n").unwrap();
        let err = merge_config(Some(yaml)).unwrap_err();
        assert!(err.contains("artifacts.backend"));
    }
}
