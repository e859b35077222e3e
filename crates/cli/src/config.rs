//! Configuration management for the CLI

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use yield_lib::PipelineConfig;

/// Load pipeline configuration, letting `--artifact-dir` win over the file
/// and environment
pub fn load(config_path: Option<&Path>, artifact_dir: Option<PathBuf>) -> Result<PipelineConfig> {
    let config = PipelineConfig::load(config_path).with_context(|| match config_path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;

    Ok(match artifact_dir {
        Some(dir) => config.with_artifact_dir(dir),
        None => config,
    })
}
