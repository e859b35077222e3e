//! Artifact and registry inspection commands

use crate::output::{format_bytes, print_info, print_table, short_checksum, OutputFormat};
use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;
use yield_lib::predictor::ModelSource;
use yield_lib::{ArtifactLoader, CategoryField, PipelineConfig, YieldPipeline};

#[derive(Tabled, Serialize)]
struct ClassRow {
    #[tabled(rename = "CODE")]
    code: usize,
    #[tabled(rename = "LABEL")]
    label: String,
}

#[derive(Tabled, Serialize)]
struct ModelRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "SOURCE")]
    source: String,
}

#[derive(Tabled, Serialize)]
struct FeatureRow {
    #[tabled(rename = "POSITION")]
    position: usize,
    #[tabled(rename = "FEATURE")]
    name: String,
}

#[derive(Tabled, Serialize)]
struct ArtifactRow {
    #[tabled(rename = "PATH")]
    path: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "SIZE")]
    size: String,
    #[tabled(rename = "SHA256")]
    sha256: String,
}

fn loader_for(config: &PipelineConfig) -> ArtifactLoader {
    ArtifactLoader::new().with_checksums(config.expected_checksums())
}

/// List the labels a categorical field accepts, in code order
pub fn show_classes(config: &PipelineConfig, field: CategoryField, format: OutputFormat) -> Result<()> {
    let path = match field {
        CategoryField::Area => config.area_encoder_path(),
        CategoryField::Item => config.item_encoder_path(),
    };
    let encoder = loader_for(config).load_encoder(&path)?;

    if matches!(format, OutputFormat::Table) {
        print_info(&format!("{} {} labels", encoder.len(), field));
    }
    let rows: Vec<ClassRow> = encoder
        .classes()
        .iter()
        .enumerate()
        .map(|(code, label)| ClassRow {
            code,
            label: label.clone(),
        })
        .collect();
    print_table(&rows, format);
    Ok(())
}

/// List registered models; needs no artifacts
pub fn show_models(config: &PipelineConfig, format: OutputFormat) {
    let registry = config.model_registry();
    let members = registry.ensemble_members().len();

    let rows: Vec<ModelRow> = registry
        .entries()
        .iter()
        .map(|entry| ModelRow {
            name: entry.name.clone(),
            source: match &entry.source {
                ModelSource::Artifact(path) => path.display().to_string(),
                ModelSource::Ensemble => format!("average of {} models", members),
            },
        })
        .collect();
    print_table(&rows, format);
}

/// Show the column order the models were trained on
pub fn show_features(config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    let spec = loader_for(config).load_feature_spec(&config.feature_names_path())?;

    let rows: Vec<FeatureRow> = spec
        .names()
        .iter()
        .enumerate()
        .map(|(position, name)| FeatureRow {
            position,
            name: name.clone(),
        })
        .collect();
    print_table(&rows, format);
    Ok(())
}

/// Load the full artifact set and print what was loaded
pub fn show_artifacts(config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    let pipeline = YieldPipeline::from_config(config)?;
    pipeline.warm_up()?;

    let rows: Vec<ArtifactRow> = pipeline
        .loader()
        .records()
        .into_iter()
        .map(|record| ArtifactRow {
            path: record.path.display().to_string(),
            kind: record.kind.to_string(),
            size: match format {
                OutputFormat::Table => format_bytes(record.size_bytes),
                OutputFormat::Json => record.size_bytes.to_string(),
            },
            sha256: match format {
                OutputFormat::Table => short_checksum(&record.checksum),
                OutputFormat::Json => record.checksum,
            },
        })
        .collect();
    print_table(&rows, format);
    Ok(())
}
