//! Prediction pipeline for crop yield regression models
//!
//! This crate provides the core functionality for:
//! - Loading and memoizing pre-fitted artifacts
//! - Encoding categorical inputs
//! - Building and scaling feature vectors
//! - Running single models or the equal-weight ensemble
//! - Metrics and structured logging

pub mod artifact;
pub mod config;
pub mod encoding;
pub mod error;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;

pub use artifact::{Artifact, ArtifactKind, ArtifactLoader, ArtifactRecord};
pub use config::{ChecksumEntry, ModelEntry, PipelineConfig};
pub use encoding::{CategoryEncoder, CategoryEncoderRegistry, CategoryField};
pub use error::PipelineError;
pub use models::*;
pub use observability::{PipelineMetrics, StructuredLogger};
pub use pipeline::YieldPipeline;
