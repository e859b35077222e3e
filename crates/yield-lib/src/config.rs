//! Pipeline configuration
//!
//! Loaded from an optional config file (format chosen by extension) with
//! `YIELD_*` environment variables layered on top, e.g. `YIELD_ARTIFACT_DIR`
//! or `YIELD_ENSEMBLE_LABEL`. Nested keys use `__`.

use crate::models::ENSEMBLE_LABEL;
use crate::predictor::ModelRegistry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A registered regression model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// User-facing model name
    pub name: String,
    /// Artifact path, relative to `artifact_dir` unless absolute
    pub path: PathBuf,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Expected SHA256 of one artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecksumEntry {
    /// Artifact path, resolved like the artifact paths it guards
    pub path: PathBuf,
    /// Lowercase or uppercase hex digest
    pub sha256: String,
}

impl ChecksumEntry {
    pub fn new(path: impl Into<PathBuf>, sha256: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sha256: sha256.into(),
        }
    }
}

/// Artifact locations and model registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    #[serde(default = "default_scaler")]
    pub scaler: PathBuf,

    #[serde(default = "default_feature_names")]
    pub feature_names: PathBuf,

    #[serde(default = "default_area_encoder")]
    pub area_encoder: PathBuf,

    #[serde(default = "default_item_encoder")]
    pub item_encoder: PathBuf,

    /// Registered models in display order
    #[serde(default = "default_models")]
    pub models: Vec<ModelEntry>,

    #[serde(default = "default_ensemble_label")]
    pub ensemble_label: String,

    /// Expected SHA256 digests. Kept as a list: table keys are lowercased
    /// by the config loader.
    #[serde(default)]
    pub checksums: Vec<ChecksumEntry>,
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_scaler() -> PathBuf {
    PathBuf::from("scaler.json")
}

fn default_feature_names() -> PathBuf {
    PathBuf::from("feature_names.json")
}

fn default_area_encoder() -> PathBuf {
    PathBuf::from("label_encoder_Area.json")
}

fn default_item_encoder() -> PathBuf {
    PathBuf::from("label_encoder_Item.json")
}

fn default_models() -> Vec<ModelEntry> {
    vec![
        ModelEntry::new("Gradient Boost", "gradient_boost_model.json"),
        ModelEntry::new("Linear Regression", "linear_regression_model.json"),
        ModelEntry::new("XGBoost", "xgboost_model.json"),
    ]
}

fn default_ensemble_label() -> String {
    ENSEMBLE_LABEL.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            scaler: default_scaler(),
            feature_names: default_feature_names(),
            area_encoder: default_area_encoder(),
            item_encoder: default_item_encoder(),
            models: default_models(),
            ensemble_label: default_ensemble_label(),
            checksums: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("YIELD")
                .prefix_separator("_")
                .separator("__"),
        );

        let config: PipelineConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Same configuration rooted at another artifact directory
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Check the model registry is usable
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            anyhow::bail!("At least one model must be configured");
        }
        if self.ensemble_label.trim().is_empty() {
            anyhow::bail!("Ensemble label must not be empty");
        }
        let mut seen = HashSet::new();
        for model in &self.models {
            if model.name == self.ensemble_label {
                anyhow::bail!(
                    "Model name '{}' collides with the ensemble label",
                    model.name
                );
            }
            if !seen.insert(model.name.as_str()) {
                anyhow::bail!("Model '{}' is configured more than once", model.name);
            }
        }

        let artifacts: HashSet<PathBuf> = self.artifact_paths().into_iter().collect();
        for entry in &self.checksums {
            if !artifacts.contains(&self.resolve(&entry.path)) {
                anyhow::bail!(
                    "Checksum given for {} which is not a configured artifact",
                    entry.path.display()
                );
            }
            if entry.sha256.len() != 64 || !entry.sha256.chars().all(|c| c.is_ascii_hexdigit()) {
                anyhow::bail!(
                    "Checksum for {} is not a SHA256 hex digest",
                    entry.path.display()
                );
            }
        }
        Ok(())
    }

    /// Resolve a configured path against `artifact_dir`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.artifact_dir.join(path)
        }
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.resolve(&self.scaler)
    }

    pub fn feature_names_path(&self) -> PathBuf {
        self.resolve(&self.feature_names)
    }

    pub fn area_encoder_path(&self) -> PathBuf {
        self.resolve(&self.area_encoder)
    }

    pub fn item_encoder_path(&self) -> PathBuf {
        self.resolve(&self.item_encoder)
    }

    /// Every configured artifact path, resolved
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![
            self.scaler_path(),
            self.feature_names_path(),
            self.area_encoder_path(),
            self.item_encoder_path(),
        ];
        paths.extend(self.models.iter().map(|m| self.resolve(&m.path)));
        paths
    }

    /// Registry of the configured models with resolved paths
    pub fn model_registry(&self) -> ModelRegistry {
        ModelRegistry::new(
            self.models
                .iter()
                .map(|m| (m.name.clone(), self.resolve(&m.path))),
            self.ensemble_label.clone(),
        )
    }

    /// Expected checksums keyed by resolved path
    pub fn expected_checksums(&self) -> HashMap<PathBuf, String> {
        self.checksums
            .iter()
            .map(|entry| (self.resolve(&entry.path), entry.sha256.clone()))
            .collect()
    }
}
