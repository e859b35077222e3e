//! ONNX Runtime inference using tract
//!
//! Regression models exported to ONNX (e.g. via skl2onnx) are loaded and
//! optimized once for a `[1, n]` f32 input, then run per request.

use super::features::ScaledVector;
use super::Regressor;
use crate::error::{PipelineError, Result};
use anyhow::Context;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based regressor using tract for lightweight inference
pub struct OnnxRegressor {
    model: TractModel,
    input_width: usize,
}

impl OnnxRegressor {
    /// Parse and optimize an ONNX model for a fixed input width
    pub fn from_bytes(model_bytes: &[u8], input_width: usize) -> anyhow::Result<Self> {
        let model = Self::load_model(model_bytes, input_width)?;
        Ok(Self { model, input_width })
    }

    fn load_model(model_bytes: &[u8], input_width: usize) -> anyhow::Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, input_width]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn to_tensor(&self, input: &ScaledVector) -> Result<Tensor> {
        let array = tract_ndarray::Array2::from_shape_vec((1, self.input_width), input.to_f32())
            .map_err(|e| PipelineError::inference(format!("Failed to shape input: {}", e)))?;
        Ok(array.into())
    }

    /// First value of the regression output, f32 or f64
    fn first_value(output: &Tensor) -> Result<f64> {
        if let Ok(view) = output.to_array_view::<f32>() {
            return view
                .iter()
                .next()
                .map(|v| *v as f64)
                .ok_or_else(|| PipelineError::inference("Model output is empty"));
        }
        let view = output
            .to_array_view::<f64>()
            .map_err(|e| PipelineError::inference(format!("Unsupported model output: {}", e)))?;
        view.iter()
            .next()
            .copied()
            .ok_or_else(|| PipelineError::inference("Model output is empty"))
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, input: &ScaledVector) -> Result<f64> {
        if input.len() != self.input_width {
            return Err(PipelineError::inference(format!(
                "Model expects {} features, input has {}",
                self.input_width,
                input.len()
            )));
        }

        let start = Instant::now();
        let tensor = self.to_tensor(input)?;
        let result = self
            .model
            .run(tvec!(tensor.into()))
            .map_err(|e| PipelineError::inference(format!("{:#}", e)))?;
        let output = result
            .first()
            .ok_or_else(|| PipelineError::inference("No output from model"))?;
        let value = Self::first_value(output)?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(value)
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_rejected() {
        let result = OnnxRegressor::from_bytes(b"definitely not protobuf", 5);
        assert!(result.is_err());
    }

    #[test]
    fn test_linear_graph_prediction() {
        let bytes = fixtures::linear_model(&[2.0, 3.0], 0.5);
        let model = OnnxRegressor::from_bytes(&bytes, 2).unwrap();

        let value = model.predict(&ScaledVector::new(vec![1.0, 2.0])).unwrap();
        assert!((value - 8.5).abs() < 1e-6);

        let value = model.predict(&ScaledVector::new(vec![-1.0, 0.0])).unwrap();
        assert!((value + 1.5).abs() < 1e-6);
        assert_eq!(model.kind(), "onnx");
    }

    #[test]
    fn test_input_width_mismatch() {
        let bytes = fixtures::linear_model(&[2.0, 3.0], 0.5);
        let model = OnnxRegressor::from_bytes(&bytes, 2).unwrap();

        let err = model
            .predict(&ScaledVector::new(vec![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert_eq!(err.kind(), "inference");
        assert!(err.to_string().contains("expects 2 features"));
    }
}
