//! Classifier asset management - resolving and downloading the model and tokenizer

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{error, info};

use super::config::ClassifierConfig;

/// Download the model and tokenizer if they are not already present
pub async fn download_assets(config: &ClassifierConfig) -> Result<()> {
    ensure_file(&config.model_path, config.model_url.as_deref(), "model").await?;
    ensure_file(
        &config.tokenizer_path,
        config.tokenizer_url.as_deref(),
        "tokenizer",
    )
    .await?;
    info!("Classifier assets ready");
    Ok(())
}

/// Resolve the on-disk locations of the model and tokenizer without downloading
pub fn resolve_paths(config: &ClassifierConfig) -> Result<(PathBuf, PathBuf)> {
    Ok((
        existing_path(&config.model_path, "model")?,
        existing_path(&config.tokenizer_path, "tokenizer")?,
    ))
}

fn existing_path(path: &Path, kind: &str) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    error!(
        "Classifier {} expected at {:?} but not found. Ensure `emotale-gateway init` populated it.",
        kind, path
    );
    anyhow::bail!(
        "Classifier {} missing at {:?}. Run `emotale-gateway init` before starting the server.",
        kind,
        path
    )
}

async fn ensure_file(path: &Path, url: Option<&str>, kind: &str) -> Result<()> {
    if path.is_file() {
        let bytes = fs::read(path)
            .await
            .with_context(|| format!("Failed to read classifier {kind} at {path:?}"))?;
        info!(
            "Using existing classifier {} at {:?} (sha256={})",
            kind,
            path,
            sha256_hex(&bytes)
        );
        return Ok(());
    }

    let url = url.with_context(|| {
        format!("Classifier {kind} not found at {path:?} and no download URL configured")
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    info!("Downloading classifier {} from: {}", kind, url);
    download_file(url, path).await
}

async fn download_file(url: &str, path: &Path) -> Result<()> {
    let response = reqwest::get(url)
        .await
        .context("Failed to download classifier asset")?;

    if !response.status().is_success() {
        anyhow::bail!(
            "Failed to download classifier asset from {}: HTTP {}",
            url,
            response.status()
        );
    }

    let bytes = response.bytes().await?;

    // Write next to the target and rename so a failed download never leaves a truncated file
    let partial = path.with_extension("partial");
    fs::write(&partial, &bytes).await?;
    fs::rename(&partial, path).await?;

    info!(
        "Downloaded {} bytes to {:?} (sha256={})",
        bytes.len(),
        path,
        sha256_hex(&bytes)
    );

    Ok(())
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
