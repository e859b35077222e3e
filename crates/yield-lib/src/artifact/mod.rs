//! Pre-fitted artifacts: scaler, feature order, category encoders, models
//!
//! This module provides:
//! - Decoding of artifact files by kind
//! - A memoizing loader keyed by path, safe under concurrent first access
//! - SHA256 checksums of every loaded artifact

mod decode;
mod loader;

pub use decode::compute_checksum;
pub use loader::ArtifactLoader;

use crate::encoding::CategoryEncoder;
use crate::predictor::{FeatureSpec, Regressor, Scaler};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// What an artifact file is expected to contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactKind {
    Scaler,
    FeatureNames,
    LabelEncoder,
    /// Regression model compiled for a fixed input width
    Model { input_width: usize },
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Scaler => f.write_str("scaler"),
            ArtifactKind::FeatureNames => f.write_str("feature_names"),
            ArtifactKind::LabelEncoder => f.write_str("label_encoder"),
            ArtifactKind::Model { input_width } => write!(f, "model[{}]", input_width),
        }
    }
}

/// A loaded artifact. Cloning shares the underlying object.
#[derive(Clone)]
pub enum Artifact {
    Scaler(Arc<Scaler>),
    FeatureNames(Arc<FeatureSpec>),
    LabelEncoder(Arc<CategoryEncoder>),
    Model(Arc<dyn Regressor>),
}

impl Artifact {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Artifact::Scaler(_) => "scaler",
            Artifact::FeatureNames(_) => "feature_names",
            Artifact::LabelEncoder(_) => "label_encoder",
            Artifact::Model(_) => "model",
        }
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Scaler(s) => f.debug_tuple("Scaler").field(s).finish(),
            Artifact::FeatureNames(s) => f.debug_tuple("FeatureNames").field(s).finish(),
            Artifact::LabelEncoder(e) => f
                .debug_struct("LabelEncoder")
                .field("classes", &e.len())
                .finish(),
            Artifact::Model(m) => f.debug_struct("Model").field("kind", &m.kind()).finish(),
        }
    }
}

/// Provenance of a loaded artifact
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRecord {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub checksum: String,
    pub size_bytes: usize,
    pub loaded_at: i64,
}
