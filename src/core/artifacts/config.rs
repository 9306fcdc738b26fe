//! Artifact store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroize;

/// Storage backend for generated audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactBackend {
    /// In-process cache, lost on restart
    Memory,
    /// Local temp directory
    #[default]
    Filesystem,
    /// S3-compatible object storage
    S3,
}

impl ArtifactBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Filesystem => "filesystem",
            Self::S3 => "s3",
        }
    }

    /// Parse a backend name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "filesystem" | "fs" | "file" => Some(Self::Filesystem),
            "s3" | "object" => Some(Self::S3),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArtifactBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// S3 settings for [`ArtifactBackend::S3`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, Zeroize)]
pub struct S3ArtifactConfig {
    pub bucket: String,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services (MinIO, R2, ...)
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Key prefix for every artifact
    pub prefix: Option<String>,
}

/// Artifact store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    pub backend: ArtifactBackend,

    /// Directory for the filesystem backend
    pub dir: PathBuf,

    /// Lifetime of an artifact in seconds
    pub ttl_seconds: u64,

    /// How often the sweeper purges expired artifacts
    pub sweep_interval_seconds: u64,

    /// Byte budget of the memory backend
    pub max_memory_bytes: u64,

    pub s3: Option<S3ArtifactConfig>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            backend: ArtifactBackend::default(),
            dir: default_artifact_dir(),
            ttl_seconds: 3600,
            sweep_interval_seconds: 300,
            max_memory_bytes: 256 * 1024 * 1024,
            s3: None,
        }
    }
}

impl ArtifactConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

/// `<tmp>/emotale-audio`
pub fn default_artifact_dir() -> PathBuf {
    std::env::temp_dir().join("emotale-audio")
}
