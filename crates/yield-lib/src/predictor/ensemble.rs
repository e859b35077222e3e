//! Ensemble aggregation

use crate::error::{PipelineError, Result};

/// Arithmetic mean of the constituent predictions.
///
/// No weighting, trimming or outlier rejection. An empty input is an
/// error rather than a neutral value.
pub fn average(predictions: &[f64]) -> Result<f64> {
    if predictions.is_empty() {
        return Err(PipelineError::EmptyEnsemble);
    }
    let sum: f64 = predictions.iter().sum();
    Ok(sum / predictions.len() as f64)
}
