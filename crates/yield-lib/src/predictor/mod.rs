//! ML prediction engine

mod ensemble;
mod features;
mod inference;
mod registry;
mod regression;
mod scaler;

pub use ensemble::average;
pub use features::{
    align, FeatureInputs, FeatureRecord, FeatureSpec, FeatureVector, FeatureVectorBuilder,
    ScaledVector, AREA, ITEM, PESTICIDES, RAINFALL, TEMPERATURE,
};
pub use inference::OnnxRegressor;
#[cfg(test)]
pub(crate) use inference::fixtures as onnx_fixtures;
pub use registry::{ModelPredictor, ModelRegistry, ModelRegistryEntry, ModelSelection, ModelSource};
pub use regression::{RegressionModel, RegressionTree, SplitRule, TreeNode};
pub use scaler::Scaler;

use crate::error::Result;

/// Trait for regression model implementations
pub trait Regressor: Send + Sync {
    /// Predict a single yield value from a scaled feature vector
    fn predict(&self, input: &ScaledVector) -> Result<f64>;

    /// Short identifier of the model family
    fn kind(&self) -> &'static str;
}
