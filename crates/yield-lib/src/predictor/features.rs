//! Feature vector assembly for model inference
//!
//! Raw inputs and encoded categories are assembled into a named record,
//! reindexed against the feature order the scaler and models were fitted
//! on, then scaled. Column order is never inferred: any mismatch between
//! the record and the fitted order aborts the request.

use super::scaler::Scaler;
use crate::error::{PipelineError, Result};
use std::collections::HashSet;
use std::sync::Arc;

pub const RAINFALL: &str = "average_rain_fall_mm_per_year";
pub const PESTICIDES: &str = "pesticides_tonnes";
pub const TEMPERATURE: &str = "avg_temp";
pub const ITEM: &str = "Item";
pub const AREA: &str = "Area";

/// Ordered feature names the scaler and models were fitted on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpec {
    names: Vec<String>,
}

impl FeatureSpec {
    pub fn new(names: Vec<String>) -> std::result::Result<Self, String> {
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(format!("duplicate feature name '{}'", name));
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Numeric inputs of one request, with categories already encoded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureInputs {
    pub rainfall: f64,
    pub pesticides: f64,
    pub temperature: f64,
    pub encoded_item: i64,
    pub encoded_area: i64,
}

/// Named feature values in assembly order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRecord {
    entries: Vec<(String, f64)>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record keyed by the five model inputs
    pub fn from_inputs(inputs: &FeatureInputs) -> Self {
        let mut record = Self::new();
        record.insert(RAINFALL, inputs.rainfall);
        record.insert(PESTICIDES, inputs.pesticides);
        record.insert(TEMPERATURE, inputs.temperature);
        record.insert(ITEM, inputs.encoded_item as f64);
        record.insert(AREA, inputs.encoded_area as f64);
        record
    }

    /// Set a value, replacing any existing value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Feature values in exactly the fitted order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Assemble the record for `inputs` and align it to `spec`
    pub fn build(inputs: &FeatureInputs, spec: &FeatureSpec) -> Result<Self> {
        align(&FeatureRecord::from_inputs(inputs), spec)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Feature vector after the scaler transform
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledVector {
    values: Vec<f64>,
}

impl ScaledVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values narrowed to f32 for tensor input
    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }
}

/// Reindex `record` to the order of `spec`.
///
/// Fails with [`PipelineError::FeatureAlignment`] naming every expected
/// feature the record lacks and every record feature the spec does not know.
pub fn align(record: &FeatureRecord, spec: &FeatureSpec) -> Result<FeatureVector> {
    let missing: Vec<String> = spec
        .names()
        .iter()
        .filter(|name| record.get(name).is_none())
        .cloned()
        .collect();
    let unexpected: Vec<String> = record
        .names()
        .filter(|name| !spec.names().iter().any(|n| n == *name))
        .map(str::to_string)
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(PipelineError::FeatureAlignment {
            missing,
            unexpected,
        });
    }

    let values = spec
        .names()
        .iter()
        .filter_map(|name| record.get(name))
        .collect();

    Ok(FeatureVector {
        names: spec.names().to_vec(),
        values,
    })
}

/// Builds scaled, model-ready vectors against a fitted spec and scaler
#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    spec: Arc<FeatureSpec>,
    scaler: Arc<Scaler>,
}

impl FeatureVectorBuilder {
    pub fn new(spec: Arc<FeatureSpec>, scaler: Arc<Scaler>) -> Self {
        Self { spec, scaler }
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    /// Aligned but unscaled vector
    pub fn build(&self, inputs: &FeatureInputs) -> Result<FeatureVector> {
        FeatureVector::build(inputs, &self.spec)
    }

    pub fn scale(&self, vector: &FeatureVector) -> Result<ScaledVector> {
        self.scaler.transform(vector)
    }

    /// Assemble, align and scale in one step
    pub fn build_scaled(&self, inputs: &FeatureInputs) -> Result<ScaledVector> {
        let vector = self.build(inputs)?;
        self.scale(&vector)
    }
}
