//! Memoizing artifact loader
//!
//! Each path owns a once-cell. The first caller for a path performs the
//! read and decode; concurrent callers for the same path block on the cell
//! and share the published result. A failed load publishes nothing, so the
//! next call retries. Entries are never evicted.

use super::decode::{compute_checksum, decode};
use super::{Artifact, ArtifactKind, ArtifactRecord};
use crate::encoding::CategoryEncoder;
use crate::error::{PipelineError, Result};
use crate::observability::{PipelineMetrics, StructuredLogger};
use crate::predictor::{FeatureSpec, Regressor, Scaler};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

struct CachedArtifact {
    artifact: Artifact,
    record: ArtifactRecord,
}

/// Loads artifacts once per path and hands out shared references
pub struct ArtifactLoader {
    cache: DashMap<PathBuf, Arc<OnceCell<CachedArtifact>>>,
    expected_checksums: HashMap<PathBuf, String>,
    load_count: AtomicU64,
    metrics: PipelineMetrics,
    logger: StructuredLogger,
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactLoader {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
            expected_checksums: HashMap::new(),
            load_count: AtomicU64::new(0),
            metrics: PipelineMetrics::new(),
            logger: StructuredLogger::new("artifact-loader"),
        }
    }

    /// Verify SHA256 checksums of the given paths on load
    pub fn with_checksums(mut self, checksums: HashMap<PathBuf, String>) -> Self {
        self.expected_checksums = checksums
            .into_iter()
            .map(|(path, sum)| (path, sum.to_ascii_lowercase()))
            .collect();
        self
    }

    /// Load `path` as `kind`, reading it only on first use
    pub fn load(&self, path: &Path, kind: ArtifactKind) -> Result<Artifact> {
        let cell = {
            let entry = self
                .cache
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };

        let cached = cell.get_or_try_init(|| self.read_artifact(path, kind))?;

        if cached.record.kind != kind {
            return Err(PipelineError::corrupt(
                path,
                format!("loaded as {} but requested as {}", cached.record.kind, kind),
            ));
        }

        Ok(cached.artifact.clone())
    }

    fn read_artifact(&self, path: &Path, kind: ArtifactKind) -> Result<CachedArtifact> {
        let start = Instant::now();

        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PipelineError::ArtifactNotFound {
                path: path.to_path_buf(),
            },
            _ => PipelineError::corrupt(path, format!("failed to read: {}", e)),
        })?;

        let checksum = compute_checksum(&bytes);
        if let Some(expected) = self.expected_checksums.get(path) {
            if *expected != checksum {
                return Err(PipelineError::corrupt(
                    path,
                    format!("checksum mismatch: expected {}, got {}", expected, checksum),
                ));
            }
            debug!(path = %path.display(), "Artifact checksum validated");
        }

        let artifact = decode(path, &bytes, kind)?;

        self.load_count.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .observe_artifact_load_latency(start.elapsed().as_secs_f64());
        self.metrics.inc_artifacts_loaded();

        self.logger.log_artifact_loaded(
            &path.display().to_string(),
            &kind.to_string(),
            bytes.len(),
            &checksum,
        );

        Ok(CachedArtifact {
            artifact,
            record: ArtifactRecord {
                path: path.to_path_buf(),
                kind,
                checksum,
                size_bytes: bytes.len(),
                loaded_at: chrono::Utc::now().timestamp(),
            },
        })
    }

    pub fn load_scaler(&self, path: &Path) -> Result<Arc<Scaler>> {
        match self.load(path, ArtifactKind::Scaler)? {
            Artifact::Scaler(scaler) => Ok(scaler),
            other => Err(mismatch(path, "scaler", &other)),
        }
    }

    pub fn load_feature_spec(&self, path: &Path) -> Result<Arc<FeatureSpec>> {
        match self.load(path, ArtifactKind::FeatureNames)? {
            Artifact::FeatureNames(spec) => Ok(spec),
            other => Err(mismatch(path, "feature_names", &other)),
        }
    }

    pub fn load_encoder(&self, path: &Path) -> Result<Arc<CategoryEncoder>> {
        match self.load(path, ArtifactKind::LabelEncoder)? {
            Artifact::LabelEncoder(encoder) => Ok(encoder),
            other => Err(mismatch(path, "label_encoder", &other)),
        }
    }

    pub fn load_model(&self, path: &Path, input_width: usize) -> Result<Arc<dyn Regressor>> {
        match self.load(path, ArtifactKind::Model { input_width })? {
            Artifact::Model(model) => Ok(model),
            other => Err(mismatch(path, "model", &other)),
        }
    }

    /// Whether `path` has been loaded successfully
    pub fn is_loaded(&self, path: &Path) -> bool {
        self.cache
            .get(path)
            .map(|cell| cell.get().is_some())
            .unwrap_or(false)
    }

    /// Provenance of every loaded artifact, sorted by path
    pub fn records(&self) -> Vec<ArtifactRecord> {
        let mut records: Vec<ArtifactRecord> = self
            .cache
            .iter()
            .filter_map(|entry| entry.value().get().map(|c| c.record.clone()))
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }

    /// Number of loads that performed I/O
    pub fn load_count(&self) -> u64 {
        self.load_count.load(Ordering::Relaxed)
    }
}

fn mismatch(path: &Path, expected: &str, found: &Artifact) -> PipelineError {
    PipelineError::corrupt(
        path,
        format!("expected {}, found {}", expected, found.kind_name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    const SCALER: &str = r#"{"kind":"standard","mean":[0.0,0.0],"scale":[1.0,2.0]}"#;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_second_load_reuses_object() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "scaler.json", SCALER);
        let loader = ArtifactLoader::new();

        let first = loader.load_scaler(&path).unwrap();
        // Changing the file must not affect the cached object
        fs::write(&path, "{}").unwrap();
        let second = loader.load_scaler(&path).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn test_concurrent_first_access_loads_once() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "scaler.json", SCALER);
        let loader = ArtifactLoader::new();

        let scalers: Vec<Arc<Scaler>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| loader.load_scaler(&path).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(loader.load_count(), 1);
        assert!(scalers.iter().all(|s| Arc::ptr_eq(s, &scalers[0])));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let loader = ArtifactLoader::new();
        let err = loader
            .load_scaler(&dir.path().join("scaler.json"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactNotFound { .. }));
        assert!(loader.records().is_empty());
    }

    #[test]
    fn test_failed_load_is_retried() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scaler.json");
        let loader = ArtifactLoader::new();

        assert!(loader.load_scaler(&path).is_err());
        fs::write(&path, SCALER).unwrap();
        assert!(loader.load_scaler(&path).is_ok());
        assert!(loader.is_loaded(&path));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "scaler.json", "not json at all");
        let err = ArtifactLoader::new().load_scaler(&path).unwrap_err();
        assert_eq!(err.kind(), "artifact_corrupt");
    }

    #[test]
    fn test_checksum_mismatch_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "scaler.json", SCALER);

        let mut checksums = HashMap::new();
        checksums.insert(path.clone(), "00".repeat(32));
        let err = ArtifactLoader::new()
            .with_checksums(checksums)
            .load_scaler(&path)
            .unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_checksum_match_accepts_uppercase() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "scaler.json", SCALER);

        let mut checksums = HashMap::new();
        checksums.insert(
            path.clone(),
            compute_checksum(SCALER.as_bytes()).to_ascii_uppercase(),
        );
        let loader = ArtifactLoader::new().with_checksums(checksums);
        assert!(loader.load_scaler(&path).is_ok());
        assert_eq!(
            loader.records()[0].checksum,
            compute_checksum(SCALER.as_bytes())
        );
    }

    #[test]
    fn test_kind_mismatch_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "scaler.json", SCALER);
        let loader = ArtifactLoader::new();

        loader.load_scaler(&path).unwrap();
        let err = loader.load_encoder(&path).unwrap_err();
        assert_eq!(err.kind(), "artifact_corrupt");
        assert!(err.to_string().contains("requested as label_encoder"));
    }

    #[test]
    fn test_records_describe_loads() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "feature_names.json", r#"["Area","Item"]"#);
        let loader = ArtifactLoader::new();
        loader.load_feature_spec(&path).unwrap();

        let records = loader.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, path);
        assert_eq!(records[0].kind, ArtifactKind::FeatureNames);
        assert_eq!(records[0].size_bytes, 15);
    }
}
