//! End-to-end prediction pipeline
//!
//! Each request runs independently through encode → build → scale →
//! predict → (average). The only state shared between requests is the
//! artifact cache.

#[cfg(test)]
mod tests;

use crate::artifact::ArtifactLoader;
use crate::config::PipelineConfig;
use crate::encoding::{CategoryEncoderRegistry, CategoryField};
use crate::error::Result;
use crate::models::{ModelPrediction, PredictionRequest, PredictionResult};
use crate::observability::{PipelineMetrics, StructuredLogger};
use crate::predictor::{
    average, FeatureInputs, FeatureSpec, FeatureVectorBuilder, ModelPredictor, ModelRegistry,
    ModelSelection,
};
use std::sync::Arc;
use std::time::Instant;

const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crop yield prediction pipeline over pre-fitted artifacts
pub struct YieldPipeline {
    loader: Arc<ArtifactLoader>,
    encoders: CategoryEncoderRegistry,
    builder: FeatureVectorBuilder,
    predictor: ModelPredictor,
    metrics: PipelineMetrics,
    logger: StructuredLogger,
}

impl YieldPipeline {
    /// Load the scaler, feature order and encoders. Models load on first use.
    pub fn new(config: &PipelineConfig, loader: Arc<ArtifactLoader>) -> Result<Self> {
        let scaler = loader.load_scaler(&config.scaler_path())?;
        let spec = loader.load_feature_spec(&config.feature_names_path())?;
        let encoders = CategoryEncoderRegistry::new(
            loader.load_encoder(&config.area_encoder_path())?,
            loader.load_encoder(&config.item_encoder_path())?,
        );

        let registry = Arc::new(config.model_registry());
        let predictor = ModelPredictor::new(registry, Arc::clone(&loader), spec.len());
        let builder = FeatureVectorBuilder::new(Arc::clone(&spec), scaler);

        let logger = StructuredLogger::new(config.artifact_dir.display().to_string());
        logger.log_startup(
            PIPELINE_VERSION,
            spec.len(),
            predictor.registry().ensemble_members().len(),
        );

        Ok(Self {
            loader,
            encoders,
            builder,
            predictor,
            metrics: PipelineMetrics::new(),
            logger,
        })
    }

    /// Build from configuration with a fresh loader that verifies the
    /// configured checksums
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let loader = ArtifactLoader::new().with_checksums(config.expected_checksums());
        Self::new(config, Arc::new(loader))
    }

    pub fn loader(&self) -> &ArtifactLoader {
        &self.loader
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.predictor.registry()
    }

    pub fn feature_spec(&self) -> &FeatureSpec {
        self.builder.spec()
    }

    /// Valid labels for a categorical field
    pub fn classes(&self, field: CategoryField) -> &[String] {
        self.encoders.classes(field)
    }

    pub fn encoders(&self) -> &CategoryEncoderRegistry {
        &self.encoders
    }

    /// Load every registered model up front
    pub fn warm_up(&self) -> Result<()> {
        for name in self.registry().ensemble_members() {
            self.predictor.model(name)?;
        }
        Ok(())
    }

    /// Serve one prediction request
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let start = Instant::now();
        let outcome = self.run(request);
        let elapsed = start.elapsed();

        match &outcome {
            Ok(result) => {
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.metrics.inc_predictions(&result.label);
                self.logger.log_prediction(
                    &result.label,
                    result.value,
                    result.constituents.len(),
                    elapsed.as_micros(),
                );
            }
            Err(e) => {
                self.metrics.inc_prediction_errors(e.kind());
                self.logger
                    .log_prediction_failed(&request.model, e.kind(), &e.to_string());
            }
        }

        outcome
    }

    fn run(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let selection = self.registry().resolve(&request.model)?;

        let inputs = FeatureInputs {
            rainfall: request.rainfall,
            pesticides: request.pesticides,
            temperature: request.temperature,
            encoded_item: self.encoders.encode(CategoryField::Item, &request.crop)?,
            encoded_area: self.encoders.encode(CategoryField::Area, &request.area)?,
        };
        let scaled = self.builder.build_scaled(&inputs)?;

        match selection {
            ModelSelection::Single(name) => {
                let value = self.predictor.predict_one(name, &scaled)?;
                Ok(PredictionResult::single(name, value))
            }
            ModelSelection::Ensemble => {
                let members = self.registry().ensemble_members();
                let values = self.predictor.predict_many(&members, &scaled)?;
                let mean = average(&values)?;
                let constituents = members
                    .iter()
                    .zip(&values)
                    .map(|(model, value)| ModelPrediction {
                        model: model.to_string(),
                        value: *value,
                    })
                    .collect();
                Ok(PredictionResult::ensemble(
                    self.registry().ensemble_label(),
                    mean,
                    constituents,
                ))
            }
        }
    }
}
