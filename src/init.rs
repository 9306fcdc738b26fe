//! Initialization helpers for preparing runtime assets before starting the
//! Emotale gateway server.
//!
//! This module hosts the logic that powers the `emotale-gateway init` CLI command.
//! The command downloads the emotion classifier model and tokenizer so that
//! regular server startups never perform network fetches.
//!
//! Typical usage from the CLI:
//!
//! ```text
//! $ CLASSIFIER_MODEL_URL=https://example.com/model.onnx \
//!   CLASSIFIER_TOKENIZER_URL=https://example.com/tokenizer.json \
//!   emotale-gateway init
//! ```
//!
//! If you prefer to invoke the initialization routine programmatically, call
//! [`run`] inside an async context:
//!
//! ```rust,no_run
//! use emotale_gateway::init;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     init::run(None).await.expect("failed to download assets");
//! });
//! ```

use anyhow::Result;
use anyhow::anyhow;
use std::path::PathBuf;

use crate::config::ServerConfig;
use crate::core::classifier::assets;

/// Download and prepare all assets required for runtime execution.
pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = match config_path {
        Some(path) => ServerConfig::from_file(&path),
        None => ServerConfig::from_env(),
    }
    .map_err(|e| anyhow!(e.to_string()))?;

    tracing::info!(
        "Preparing classifier assets: model={:?}, tokenizer={:?}",
        config.classifier.model_path,
        config.classifier.tokenizer_path
    );
    assets::download_assets(&config.classifier).await?;

    tracing::info!("Classifier assets downloaded successfully");

    Ok(())
}
