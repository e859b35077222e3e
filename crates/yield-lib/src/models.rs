//! Request and response types shared with the host

use serde::{Deserialize, Serialize};

/// Label of the synthetic registry entry that averages every model
pub const ENSEMBLE_LABEL: &str = "Average of All Models";

/// Unit of every predicted value
pub const YIELD_UNIT: &str = "hg/ha_yield";

/// One prediction request, already validated by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub area: String,
    pub crop: String,
    /// Average rainfall in mm per year, non-negative
    pub rainfall: f64,
    /// Pesticide use in tonnes, non-negative
    pub pesticides: f64,
    /// Average temperature in degrees Celsius
    pub temperature: f64,
    /// Registered model name or the ensemble label
    pub model: String,
}

/// Prediction of a single constituent model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub model: String,
    pub value: f64,
}

/// Result handed back to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Model name, or the ensemble label
    pub label: String,
    /// Predicted yield in hg/ha
    pub value: f64,
    /// Per-model values that were averaged, empty for single-model results
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constituents: Vec<ModelPrediction>,
}

impl PredictionResult {
    pub fn single(model: impl Into<String>, value: f64) -> Self {
        Self {
            label: model.into(),
            value,
            constituents: Vec::new(),
        }
    }

    pub fn ensemble(label: impl Into<String>, value: f64, constituents: Vec<ModelPrediction>) -> Self {
        Self {
            label: label.into(),
            value,
            constituents,
        }
    }

    pub fn is_ensemble(&self) -> bool {
        !self.constituents.is_empty()
    }
}
