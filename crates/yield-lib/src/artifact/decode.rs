//! Artifact file decoding

use super::{Artifact, ArtifactKind};
use crate::encoding::CategoryEncoder;
use crate::error::{PipelineError, Result};
use crate::predictor::{FeatureSpec, OnnxRegressor, RegressionModel, Scaler};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

/// On-disk layout of a label encoder
#[derive(Deserialize)]
struct LabelEncoderFile {
    classes: Vec<String>,
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn parse_json<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| PipelineError::corrupt(path, format!("invalid JSON: {}", e)))
}

fn is_onnx(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("onnx"))
        .unwrap_or(false)
}

/// Decode raw artifact bytes as `kind`
pub(crate) fn decode(path: &Path, bytes: &[u8], kind: ArtifactKind) -> Result<Artifact> {
    match kind {
        ArtifactKind::Scaler => {
            let scaler: Scaler = parse_json(path, bytes)?;
            scaler
                .validate()
                .map_err(|reason| PipelineError::corrupt(path, reason))?;
            Ok(Artifact::Scaler(Arc::new(scaler)))
        }
        ArtifactKind::FeatureNames => {
            let names: Vec<String> = parse_json(path, bytes)?;
            let spec = FeatureSpec::new(names).map_err(|reason| PipelineError::corrupt(path, reason))?;
            Ok(Artifact::FeatureNames(Arc::new(spec)))
        }
        ArtifactKind::LabelEncoder => {
            let file: LabelEncoderFile = parse_json(path, bytes)?;
            let encoder = CategoryEncoder::from_classes(file.classes)
                .map_err(|reason| PipelineError::corrupt(path, reason))?;
            Ok(Artifact::LabelEncoder(Arc::new(encoder)))
        }
        ArtifactKind::Model { input_width } if is_onnx(path) => {
            let model = OnnxRegressor::from_bytes(bytes, input_width)
                .map_err(|e| PipelineError::corrupt(path, format!("{:#}", e)))?;
            Ok(Artifact::Model(Arc::new(model)))
        }
        ArtifactKind::Model { input_width } => {
            let model: RegressionModel = parse_json(path, bytes)?;
            model
                .validate(input_width)
                .map_err(|reason| PipelineError::corrupt(path, reason))?;
            Ok(Artifact::Model(Arc::new(model)))
        }
    }
}
