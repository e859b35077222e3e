//! Observability infrastructure for the prediction pipeline
//!
//! Provides:
//! - Prometheus metrics (artifact load latency, prediction latency, counts)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PipelineMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct PipelineMetricsInner {
    artifact_load_latency_seconds: Histogram,
    prediction_latency_seconds: Histogram,
    artifacts_loaded: IntGauge,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
}

impl PipelineMetricsInner {
    fn new() -> Self {
        Self {
            artifact_load_latency_seconds: register_histogram!(
                "yield_artifact_load_latency_seconds",
                "Time spent reading and decoding an artifact",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register artifact_load_latency_seconds"),

            prediction_latency_seconds: register_histogram!(
                "yield_prediction_latency_seconds",
                "Time spent serving one prediction request end to end",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            artifacts_loaded: register_int_gauge!(
                "yield_artifacts_loaded",
                "Number of artifacts held in the in-memory cache"
            )
            .expect("Failed to register artifacts_loaded"),

            predictions_total: register_int_counter_vec!(
                "yield_predictions_total",
                "Total number of predictions served",
                &["model"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "yield_prediction_errors_total",
                "Total number of failed prediction requests",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),
        }
    }
}

/// Pipeline metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PipelineMetrics {
    _private: (),
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PipelineMetricsInner {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new)
    }

    pub fn observe_artifact_load_latency(&self, duration_secs: f64) {
        self.inner().artifact_load_latency_seconds.observe(duration_secs);
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_artifacts_loaded(&self) {
        self.inner().artifacts_loaded.inc();
    }

    /// Count a served prediction under its result label
    pub fn inc_predictions(&self, label: &str) {
        self.inner()
            .predictions_total
            .with_label_values(&[label])
            .inc();
    }

    /// Count a failed request under its error kind
    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn predictions_served(&self, label: &str) -> u64 {
        self.inner()
            .predictions_total
            .with_label_values(&[label])
            .get()
    }

    pub fn prediction_errors(&self, kind: &str) -> u64 {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .get()
    }
}

/// Structured logger for pipeline events
///
/// Provides consistent JSON-formatted logging for predictions and
/// pipeline lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    pipeline: String,
}

impl StructuredLogger {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
        }
    }

    /// Log pipeline start-up once the preprocessing artifacts are loaded
    pub fn log_startup(&self, version: &str, feature_count: usize, model_count: usize) {
        info!(
            event = "pipeline_started",
            pipeline = %self.pipeline,
            version = %version,
            feature_count = feature_count,
            model_count = model_count,
            "Prediction pipeline ready"
        );
    }

    /// Log an artifact read from disk
    pub fn log_artifact_loaded(&self, path: &str, kind: &str, size: usize, checksum: &str) {
        info!(
            event = "artifact_loaded",
            pipeline = %self.pipeline,
            path = %path,
            kind = %kind,
            size = size,
            checksum = %checksum,
            "Loaded artifact"
        );
    }

    /// Log a served prediction
    pub fn log_prediction(&self, label: &str, value: f64, constituents: usize, elapsed_us: u128) {
        info!(
            event = "prediction_generated",
            pipeline = %self.pipeline,
            label = %label,
            value = value,
            constituents = constituents,
            elapsed_us = elapsed_us as u64,
            "Generated yield prediction"
        );
    }

    /// Log a failed prediction request
    pub fn log_prediction_failed(&self, model: &str, kind: &str, error: &str) {
        warn!(
            event = "prediction_failed",
            pipeline = %self.pipeline,
            model = %model,
            error_kind = %kind,
            error = %error,
            "Prediction request failed"
        );
    }
}
