use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// This structure represents the full configuration that can be loaded from a YAML file.
/// All fields are optional to allow partial configuration. Values present here
/// override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5000
///   tls:
///     enabled: true
///     cert_path: "/etc/emotale/cert.pem"
///     key_path: "/etc/emotale/key.pem"
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
///
/// classifier:
///   model_path: "./text_emotion_model/model.onnx"
///   tokenizer_path: "./text_emotion_model/tokenizer.json"
///   max_sequence_length: 128
///   session_pool_size: 2
///
/// generation:
///   api_key: "your-gemini-key"
///   model: "gemini-2.0-flash"
///   timeout_seconds: 30
///
/// synthesis:
///   api_key: "your-elevenlabs-key"
///   voice_id: "21m00Tcm4TlvDq8N2xHY"
///   model_id: "eleven_multilingual_v2"
///
/// retry:
///   max_attempts: 3
///   initial_delay_ms: 500
///
/// artifacts:
///   backend: s3
///   ttl_seconds: 3600
///   s3:
///     bucket: "emotale-audio"
///     region: "us-east-1"
///     prefix: "stories"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub security: Option<SecurityYaml>,
    pub classifier: Option<ClassifierYaml>,
    pub generation: Option<GenerationYaml>,
    pub synthesis: Option<SynthesisYaml>,
    pub retry: Option<RetryYaml>,
    pub artifacts: Option<ArtifactsYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ClassifierYaml {
    pub model_path: Option<String>,
    pub tokenizer_path: Option<String>,
    pub max_sequence_length: Option<usize>,
    pub session_pool_size: Option<usize>,
    pub num_threads: Option<usize>,
    pub model_url: Option<String>,
    pub tokenizer_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GenerationYaml {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub prompt_template: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisYaml {
    pub api_key: Option<String>,
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
    pub output_format: Option<String>,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RetryYaml {
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ArtifactsYaml {
    pub backend: Option<String>,
    pub dir: Option<String>,
    pub ttl_seconds: Option<u64>,
    pub sweep_interval_seconds: Option<u64>,
    pub max_memory_bytes: Option<u64>,
    pub s3: Option<S3Yaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct S3Yaml {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub prefix: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  tls:
    enabled: true
    cert_path: "/certs/cert.pem"
    key_path: "/certs/key.pem"

security:
  cors_allowed_origins: "*"
  rate_limit_requests_per_second: 20

classifier:
  model_path: "/models/emotion.onnx"
  max_sequence_length: 64

generation:
  api_key: "gemini-key"
  prompt_template: "A story about {emotion}"

synthesis:
  api_key: "el-key"
  stability: 0.4

retry:
  max_attempts: 5
  backoff_multiplier: 1.5

artifacts:
  backend: s3
  s3:
    bucket: "audio-bucket"
    prefix: "stories"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.tls.as_ref().unwrap().enabled, Some(true));
        assert_eq!(
            config.security.as_ref().unwrap().rate_limit_requests_per_second,
            Some(20)
        );
        assert_eq!(
            config.classifier.as_ref().unwrap().max_sequence_length,
            Some(64)
        );
        assert_eq!(
            config.generation.as_ref().unwrap().prompt_template.as_deref(),
            Some("A story about {emotion}")
        );
        assert_eq!(config.synthesis.as_ref().unwrap().stability, Some(0.4));
        assert_eq!(config.retry.as_ref().unwrap().max_attempts, Some(5));
        let artifacts = config.artifacts.as_ref().unwrap();
        assert_eq!(artifacts.backend.as_deref(), Some("s3"));
        assert_eq!(
            artifacts.s3.as_ref().unwrap().bucket.as_deref(),
            Some("audio-bucket")
        );
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
server:
  port: 9000

artifacts:
  ttl_seconds: 7200
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(config.server.as_ref().unwrap().host.is_none());
        assert_eq!(config.server.as_ref().unwrap().port, Some(9000));
        assert!(config.generation.is_none());
        assert_eq!(config.artifacts.as_ref().unwrap().ttl_seconds, Some(7200));
        assert!(config.artifacts.as_ref().unwrap().backend.is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("").unwrap_or_default();
        assert!(config.server.is_none());
        assert!(config.synthesis.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "synthesis:\n  voice_id: \"voice-123\"\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(
            config.synthesis.unwrap().voice_id.as_deref(),
            Some("voice-123")
        );
    }

    #[test]
    fn test_from_file_missing() {
        let path = PathBuf::from("/nonexistent/emotale.yaml");
        let err = YamlConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
