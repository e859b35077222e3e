//! Fitted feature scalers

use super::features::{FeatureVector, ScaledVector};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Scaler fitted during training, applied column-wise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `lo + (x - min) * (hi - lo) / (max - min)`
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "default_feature_range")]
        feature_range: (f64, f64),
    },
    /// Passes values through unchanged
    Identity,
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

/// Zero-width columns divide by one instead of zero
fn handle_zero(width: f64) -> f64 {
    if width == 0.0 {
        1.0
    } else {
        width
    }
}

impl Scaler {
    /// Number of columns the scaler was fitted on, if it is fixed
    pub fn n_features(&self) -> Option<usize> {
        match self {
            Scaler::Standard { mean, .. } => Some(mean.len()),
            Scaler::MinMax { data_min, .. } => Some(data_min.len()),
            Scaler::Identity => None,
        }
    }

    /// Check parameter consistency after deserialization
    pub fn validate(&self) -> std::result::Result<(), String> {
        let finite = |values: &[f64]| values.iter().all(|v| v.is_finite());
        match self {
            Scaler::Standard { mean, scale } => {
                if mean.len() != scale.len() {
                    return Err(format!(
                        "mean has {} entries but scale has {}",
                        mean.len(),
                        scale.len()
                    ));
                }
                if !finite(mean) || !finite(scale) {
                    return Err("non-finite scaler parameter".to_string());
                }
            }
            Scaler::MinMax {
                data_min,
                data_max,
                feature_range,
            } => {
                if data_min.len() != data_max.len() {
                    return Err(format!(
                        "data_min has {} entries but data_max has {}",
                        data_min.len(),
                        data_max.len()
                    ));
                }
                if !finite(data_min) || !finite(data_max) {
                    return Err("non-finite scaler parameter".to_string());
                }
                if feature_range.0 >= feature_range.1 {
                    return Err(format!(
                        "feature_range ({}, {}) is empty",
                        feature_range.0, feature_range.1
                    ));
                }
            }
            Scaler::Identity => {}
        }
        Ok(())
    }

    /// Transform an aligned vector. Width mismatch and non-finite output
    /// fail with [`PipelineError::Scaling`].
    pub fn transform(&self, vector: &FeatureVector) -> Result<ScaledVector> {
        let input = vector.values();
        if let Some(expected) = self.n_features() {
            if input.len() != expected {
                return Err(PipelineError::Scaling {
                    reason: format!(
                        "scaler expects {} features, vector has {}",
                        expected,
                        input.len()
                    ),
                });
            }
        }

        let values: Vec<f64> = match self {
            Scaler::Standard { mean, scale } => input
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / handle_zero(*s))
                .collect(),
            Scaler::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
            } => input
                .iter()
                .zip(data_min.iter().zip(data_max))
                .map(|(x, (min, max))| lo + (x - min) * (hi - lo) / handle_zero(max - min))
                .collect(),
            Scaler::Identity => input.to_vec(),
        };

        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(PipelineError::Scaling {
                reason: format!(
                    "feature '{}' scaled to a non-finite value",
                    vector.names().get(pos).map(String::as_str).unwrap_or("?")
                ),
            });
        }

        Ok(ScaledVector::new(values))
    }
}
