//! Scenario tests for the prediction pipeline
//!
//! These tests write a complete artifact set to a temporary directory and
//! drive requests through the pipeline the way the host does.

#[cfg(test)]
mod scenario_tests {
    use crate::artifact::ArtifactLoader;
    use crate::config::{ChecksumEntry, PipelineConfig};
    use crate::encoding::CategoryField;
    use crate::error::PipelineError;
    use crate::models::{PredictionRequest, ENSEMBLE_LABEL};
    use crate::pipeline::YieldPipeline;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    const FEATURE_NAMES: &str = r#"["Area", "Item", "average_rain_fall_mm_per_year", "pesticides_tonnes", "avg_temp"]"#;

    const MEAN: [f64; 5] = [50.0, 5.0, 1100.0, 37000.0, 20.5];
    const SCALE: [f64; 5] = [30.0, 3.0, 700.0, 59000.0, 6.3];
    const COEFFICIENTS: [f64; 5] = [100.0, -2000.0, 500.0, 300.0, -1500.0];
    const INTERCEPT: f64 = 77000.0;

    // Expected tree outputs for the Albania/Maize request, see the artifacts
    const GRADIENT_BOOST_VALUE: f64 = 60000.0 + 0.1 * (8000.0 + 5000.0);
    const XGBOOST_VALUE: f64 = 50000.0 + 12000.0 + 2500.0;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    /// Write a full artifact set matching the default configuration
    fn create_artifacts(dir: &Path) {
        write(dir, "feature_names.json", FEATURE_NAMES);
        write(
            dir,
            "scaler.json",
            &serde_json::json!({"kind": "standard", "mean": MEAN, "scale": SCALE}).to_string(),
        );
        write(
            dir,
            "label_encoder_Area.json",
            r#"{"classes": ["Albania", "Algeria", "Angola", "Argentina"]}"#,
        );
        write(
            dir,
            "label_encoder_Item.json",
            r#"{"classes": ["Cassava", "Maize", "Plantains and others", "Potatoes", "Rice, paddy"]}"#,
        );
        write(
            dir,
            "linear_regression_model.json",
            &serde_json::json!({
                "kind": "linear",
                "coefficients": COEFFICIENTS,
                "intercept": INTERCEPT
            })
            .to_string(),
        );
        write(
            dir,
            "gradient_boost_model.json",
            r#"{
                "kind": "gradient_boosting",
                "init": 60000.0,
                "learning_rate": 0.1,
                "trees": [
                    {"nodes": [
                        {"feature": 1, "threshold": -1.0, "left": 1, "right": 2},
                        {"value": 8000.0},
                        {"value": -4000.0}
                    ]},
                    {"nodes": [
                        {"feature": 4, "threshold": 0.0, "left": 1, "right": 2},
                        {"value": 5000.0},
                        {"value": -5000.0}
                    ]}
                ]
            }"#,
        );
        write(
            dir,
            "xgboost_model.json",
            r#"{
                "kind": "xgboost",
                "base_score": 50000.0,
                "trees": [
                    {"nodes": [
                        {"feature": 2, "threshold": 0.5, "left": 1, "right": 2},
                        {"value": -3000.0},
                        {"value": 12000.0}
                    ]},
                    {"nodes": [
                        {"feature": 0, "threshold": -1.0, "left": 1, "right": 4},
                        {"feature": 3, "threshold": 0.0, "left": 2, "right": 3},
                        {"value": 2500.0},
                        {"value": -2500.0},
                        {"value": 0.0}
                    ]}
                ]
            }"#,
        );
    }

    fn setup() -> (TempDir, Arc<YieldPipeline>) {
        let dir = TempDir::new().unwrap();
        create_artifacts(dir.path());
        let config = PipelineConfig::default().with_artifact_dir(dir.path());
        let pipeline = YieldPipeline::new(&config, Arc::new(ArtifactLoader::new())).unwrap();
        (dir, Arc::new(pipeline))
    }

    fn request(crop: &str, model: &str) -> PredictionRequest {
        PredictionRequest {
            area: "Albania".to_string(),
            crop: crop.to_string(),
            rainfall: 1485.0,
            pesticides: 121.0,
            temperature: 16.37,
            model: model.to_string(),
        }
    }

    /// Linear model output computed by hand for the Albania/Maize request
    fn expected_linear() -> f64 {
        let raw = [0.0, 1.0, 1485.0, 121.0, 16.37];
        let dot: f64 = raw
            .iter()
            .zip(MEAN.iter().zip(SCALE.iter()))
            .zip(COEFFICIENTS.iter())
            .map(|((x, (m, s)), c)| c * (x - m) / s)
            .sum();
        dot + INTERCEPT
    }

    #[test]
    fn test_single_model_prediction() {
        let (_dir, pipeline) = setup();
        let result = pipeline
            .predict(&request("Maize", "Linear Regression"))
            .unwrap();

        assert_eq!(result.label, "Linear Regression");
        assert!((result.value - expected_linear()).abs() < 1e-6);
        assert!(!result.is_ensemble());
        // Four preprocessing artifacts plus the one model used
        assert_eq!(pipeline.loader().load_count(), 5);
    }

    #[test]
    fn test_tree_models() {
        let (_dir, pipeline) = setup();
        let gb = pipeline.predict(&request("Maize", "Gradient Boost")).unwrap();
        assert!((gb.value - GRADIENT_BOOST_VALUE).abs() < 1e-9);
        let xgb = pipeline.predict(&request("Maize", "XGBoost")).unwrap();
        assert!((xgb.value - XGBOOST_VALUE).abs() < 1e-9);
    }

    #[test]
    fn test_ensemble_averages_every_model() {
        let (_dir, pipeline) = setup();
        let result = pipeline.predict(&request("Maize", ENSEMBLE_LABEL)).unwrap();

        assert_eq!(result.label, ENSEMBLE_LABEL);
        let models: Vec<&str> = result
            .constituents
            .iter()
            .map(|c| c.model.as_str())
            .collect();
        assert_eq!(models, vec!["Gradient Boost", "Linear Regression", "XGBoost"]);

        let expected = (GRADIENT_BOOST_VALUE + expected_linear() + XGBOOST_VALUE) / 3.0;
        assert!((result.value - expected).abs() < 1e-6);

        for constituent in &result.constituents {
            let single = pipeline
                .predict(&request("Maize", &constituent.model))
                .unwrap();
            assert_eq!(single.value, constituent.value);
        }
    }

    #[test]
    fn test_unknown_crop_fails_before_any_model_runs() {
        let (_dir, pipeline) = setup();
        let err = pipeline
            .predict(&request("Unicornfruit", "Linear Regression"))
            .unwrap_err();

        match err {
            PipelineError::UnknownCategory { field, label } => {
                assert_eq!(field, CategoryField::Item);
                assert_eq!(label, "Unicornfruit");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(pipeline.loader().load_count(), 4);
    }

    #[test]
    fn test_unknown_area() {
        let (_dir, pipeline) = setup();
        let mut req = request("Maize", ENSEMBLE_LABEL);
        req.area = "Atlantis".to_string();
        let err = pipeline.predict(&req).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnknownCategory {
                field: CategoryField::Area,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_model() {
        let (_dir, pipeline) = setup();
        let err = pipeline
            .predict(&request("Maize", "Random Forest"))
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_model");
    }

    #[test]
    fn test_feature_misalignment_aborts() {
        let dir = TempDir::new().unwrap();
        create_artifacts(dir.path());
        write(
            dir.path(),
            "feature_names.json",
            r#"["Area", "Item", "Year", "average_rain_fall_mm_per_year", "pesticides_tonnes"]"#,
        );
        let config = PipelineConfig::default().with_artifact_dir(dir.path());
        let pipeline = YieldPipeline::new(&config, Arc::new(ArtifactLoader::new())).unwrap();

        let err = pipeline
            .predict(&request("Maize", "Linear Regression"))
            .unwrap_err();
        match err {
            PipelineError::FeatureAlignment { missing, unexpected } => {
                assert_eq!(missing, vec!["Year".to_string()]);
                assert_eq!(unexpected, vec!["avg_temp".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(pipeline.loader().load_count(), 4);
    }

    #[test]
    fn test_scaler_width_mismatch() {
        let dir = TempDir::new().unwrap();
        create_artifacts(dir.path());
        write(
            dir.path(),
            "scaler.json",
            r#"{"kind": "standard", "mean": [0.0, 0.0, 0.0, 0.0], "scale": [1.0, 1.0, 1.0, 1.0]}"#,
        );
        let config = PipelineConfig::default().with_artifact_dir(dir.path());
        let pipeline = YieldPipeline::new(&config, Arc::new(ArtifactLoader::new())).unwrap();

        let err = pipeline
            .predict(&request("Maize", "Linear Regression"))
            .unwrap_err();
        assert_eq!(err.kind(), "scaling");
    }

    #[test]
    fn test_ensemble_is_all_or_nothing() {
        let (dir, pipeline) = setup();
        fs::remove_file(dir.path().join("xgboost_model.json")).unwrap();

        let err = pipeline.predict(&request("Maize", ENSEMBLE_LABEL)).unwrap_err();
        match err {
            PipelineError::ModelFailed { model, source } => {
                assert_eq!(model, "XGBoost");
                assert!(matches!(*source, PipelineError::ArtifactNotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_preprocessing_artifact() {
        let dir = TempDir::new().unwrap();
        create_artifacts(dir.path());
        fs::remove_file(dir.path().join("label_encoder_Item.json")).unwrap();
        let config = PipelineConfig::default().with_artifact_dir(dir.path());

        let err = YieldPipeline::new(&config, Arc::new(ArtifactLoader::new()))
            .err()
            .unwrap();
        match err {
            PipelineError::ArtifactNotFound { path } => {
                assert!(path.ends_with("label_encoder_Item.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_checksums_verified_from_config() {
        let dir = TempDir::new().unwrap();
        create_artifacts(dir.path());
        let mut config = PipelineConfig::default().with_artifact_dir(dir.path());
        config
            .checksums
            .push(ChecksumEntry::new("scaler.json", "ff".repeat(32)));

        let err = YieldPipeline::from_config(&config).err().unwrap();
        assert_eq!(err.kind(), "artifact_corrupt");
    }

    #[test]
    fn test_mixed_case_checksum_path_from_file_is_verified() {
        let dir = TempDir::new().unwrap();
        create_artifacts(dir.path());
        let config_path = dir.path().join("yield.toml");
        fs::write(
            &config_path,
            format!(
                "[[checksums]]\npath = \"label_encoder_Area.json\"\nsha256 = \"{}\"\n",
                "ff".repeat(32)
            ),
        )
        .unwrap();

        let config = PipelineConfig::load(Some(&config_path))
            .unwrap()
            .with_artifact_dir(dir.path());
        let err = YieldPipeline::from_config(&config).err().unwrap();
        match err {
            PipelineError::ArtifactCorrupt { path, reason } => {
                assert!(path.ends_with("label_encoder_Area.json"));
                assert!(reason.contains("checksum mismatch"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_classes_and_feature_spec() {
        let (_dir, pipeline) = setup();
        assert_eq!(pipeline.classes(CategoryField::Area).len(), 4);
        assert_eq!(pipeline.classes(CategoryField::Item)[1], "Maize");
        assert_eq!(pipeline.feature_spec().len(), 5);
        assert_eq!(pipeline.feature_spec().names()[2], "average_rain_fall_mm_per_year");
    }

    #[test]
    fn test_warm_up_loads_all_models() {
        let (_dir, pipeline) = setup();
        pipeline.warm_up().unwrap();
        assert_eq!(pipeline.loader().records().len(), 7);

        pipeline.predict(&request("Maize", ENSEMBLE_LABEL)).unwrap();
        assert_eq!(pipeline.loader().load_count(), 7);
    }

    #[test]
    fn test_concurrent_requests_share_cache() {
        let (_dir, pipeline) = setup();

        let values: Vec<f64> = thread::scope(|scope| {
            let handles: Vec<_> = (0..6)
                .map(|_| {
                    let pipeline = Arc::clone(&pipeline);
                    scope.spawn(move || {
                        pipeline
                            .predict(&request("Maize", ENSEMBLE_LABEL))
                            .unwrap()
                            .value
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(values.iter().all(|v| *v == values[0]));
        assert_eq!(pipeline.loader().load_count(), 7);
    }
}
