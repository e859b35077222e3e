//! Model registry and predictor
//!
//! The registry is static for the process lifetime. Models are loaded
//! through the shared artifact loader the first time they are used.

use super::features::ScaledVector;
use super::Regressor;
use crate::artifact::ArtifactLoader;
use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Where a registered model comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Artifact(PathBuf),
    /// Synthetic entry averaging every artifact-backed model
    Ensemble,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRegistryEntry {
    pub name: String,
    pub source: ModelSource,
}

/// Resolved routing for a requested model name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSelection<'a> {
    Single(&'a str),
    Ensemble,
}

/// User-facing model names in registration order, ensemble entry last
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: Vec<ModelRegistryEntry>,
}

impl ModelRegistry {
    /// Register `models` in order and append the ensemble entry
    pub fn new(
        models: impl IntoIterator<Item = (String, PathBuf)>,
        ensemble_label: impl Into<String>,
    ) -> Self {
        let mut entries: Vec<ModelRegistryEntry> = models
            .into_iter()
            .map(|(name, path)| ModelRegistryEntry {
                name,
                source: ModelSource::Artifact(path),
            })
            .collect();
        entries.push(ModelRegistryEntry {
            name: ensemble_label.into(),
            source: ModelSource::Ensemble,
        });
        Self { entries }
    }

    pub fn entries(&self) -> &[ModelRegistryEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&ModelRegistryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn ensemble_label(&self) -> &str {
        self.entries
            .iter()
            .find(|e| e.source == ModelSource::Ensemble)
            .map(|e| e.name.as_str())
            .unwrap_or_default()
    }

    /// Artifact-backed model names in registration order
    pub fn ensemble_members(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| matches!(e.source, ModelSource::Artifact(_)))
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Artifact path of a predictable model
    pub fn model_path(&self, name: &str) -> Result<&Path> {
        match self.get(name).map(|e| &e.source) {
            Some(ModelSource::Artifact(path)) => Ok(path),
            _ => Err(PipelineError::UnknownModel {
                name: name.to_string(),
            }),
        }
    }

    /// Route a requested name to one model or the ensemble
    pub fn resolve<'a>(&'a self, name: &str) -> Result<ModelSelection<'a>> {
        match self.get(name) {
            Some(ModelRegistryEntry {
                name,
                source: ModelSource::Artifact(_),
            }) => Ok(ModelSelection::Single(name)),
            Some(ModelRegistryEntry {
                source: ModelSource::Ensemble,
                ..
            }) => Ok(ModelSelection::Ensemble),
            None => Err(PipelineError::UnknownModel {
                name: name.to_string(),
            }),
        }
    }
}

/// Runs registered models on scaled vectors
pub struct ModelPredictor {
    registry: Arc<ModelRegistry>,
    loader: Arc<ArtifactLoader>,
    input_width: usize,
}

impl ModelPredictor {
    pub fn new(registry: Arc<ModelRegistry>, loader: Arc<ArtifactLoader>, input_width: usize) -> Self {
        Self {
            registry,
            loader,
            input_width,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Loaded model for `name`, memoized by the artifact loader
    pub fn model(&self, name: &str) -> Result<Arc<dyn Regressor>> {
        let path = self.registry.model_path(name)?;
        self.loader.load_model(path, self.input_width)
    }

    pub fn predict_one(&self, model_name: &str, scaled: &ScaledVector) -> Result<f64> {
        let model = self.model(model_name)?;
        let value = model.predict(scaled)?;
        if !value.is_finite() {
            return Err(PipelineError::inference(format!(
                "{} model produced a non-finite value",
                model.kind()
            )));
        }
        debug!(model = %model_name, kind = model.kind(), value = value, "Model prediction");
        Ok(value)
    }

    /// Predictions aligned with `model_names`.
    ///
    /// Every name is checked before any model runs. The first failing model
    /// aborts the batch with its name attached.
    pub fn predict_many(&self, model_names: &[&str], scaled: &ScaledVector) -> Result<Vec<f64>> {
        for name in model_names {
            self.registry.model_path(name)?;
        }

        model_names
            .iter()
            .map(|name| {
                self.predict_one(name, scaled)
                    .map_err(|e| PipelineError::ModelFailed {
                        model: name.to_string(),
                        source: Box::new(e),
                    })
            })
            .collect()
    }
}
