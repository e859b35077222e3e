//! Error taxonomy for the prediction pipeline
//!
//! Every variant is a hard stop for the current request. Nothing in the
//! pipeline retries or substitutes a default value after one of these.

use crate::encoding::CategoryField;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the prediction pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Artifact file does not exist at the resolved path
    #[error("Artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    /// Artifact exists but could not be read, decoded or verified
    #[error("Artifact {} is corrupt: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    /// Label is not one of the categories the encoder was fitted on
    #[error("Unknown {field} category '{label}'")]
    UnknownCategory { field: CategoryField, label: String },

    /// Model name is not a registered, predictable model
    #[error("Unknown model '{name}'")]
    UnknownModel { name: String },

    /// Assembled features do not match the fitted feature order
    #[error(
        "Feature alignment failed: missing [{}], unexpected [{}]",
        missing.join(", "),
        unexpected.join(", ")
    )]
    FeatureAlignment {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Scaler transform rejected the feature vector
    #[error("Scaling failed: {reason}")]
    Scaling { reason: String },

    /// Model evaluation failed or produced an unusable value
    #[error("Inference failed: {reason}")]
    Inference { reason: String },

    /// A constituent model of a batch failed
    #[error("Model '{model}' failed: {source}")]
    ModelFailed {
        model: String,
        #[source]
        source: Box<PipelineError>,
    },

    /// Ensemble average requested over zero predictions
    #[error("Cannot average an empty ensemble")]
    EmptyEnsemble,
}

impl PipelineError {
    /// Stable identifier used in log events and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ArtifactNotFound { .. } => "artifact_not_found",
            PipelineError::ArtifactCorrupt { .. } => "artifact_corrupt",
            PipelineError::UnknownCategory { .. } => "unknown_category",
            PipelineError::UnknownModel { .. } => "unknown_model",
            PipelineError::FeatureAlignment { .. } => "feature_alignment",
            PipelineError::Scaling { .. } => "scaling",
            PipelineError::Inference { .. } => "inference",
            PipelineError::ModelFailed { .. } => "model_failed",
            PipelineError::EmptyEnsemble => "empty_ensemble",
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::ArtifactCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn inference(reason: impl Into<String>) -> Self {
        PipelineError::Inference {
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
