//! Prediction command

use crate::output::{format_yield, print_json, print_success, print_table, OutputFormat};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;
use yield_lib::{PipelineConfig, PredictionRequest, YieldPipeline};

/// Lowest accepted average temperature in °C
pub const MIN_TEMPERATURE: f64 = -10.0;

/// Raw prediction inputs as given on the command line
#[derive(Debug, Clone)]
pub struct PredictArgs {
    pub area: String,
    pub crop: String,
    pub rainfall: f64,
    pub pesticides: f64,
    pub temperature: f64,
    pub model: Option<String>,
}

/// Table row for an ensemble constituent
#[derive(Tabled, Serialize)]
struct ConstituentRow {
    #[tabled(rename = "MODEL")]
    model: String,
    #[tabled(rename = "PREDICTION")]
    prediction: String,
}

/// Reject inputs outside the ranges the form accepts
pub fn validate_inputs(args: &PredictArgs) -> Result<()> {
    if args.area.trim().is_empty() {
        bail!("Area must not be empty");
    }
    if args.crop.trim().is_empty() {
        bail!("Crop must not be empty");
    }
    if !args.rainfall.is_finite() || args.rainfall < 0.0 {
        bail!("Rainfall must be a non-negative number, got {}", args.rainfall);
    }
    if !args.pesticides.is_finite() || args.pesticides < 0.0 {
        bail!(
            "Pesticides must be a non-negative number, got {}",
            args.pesticides
        );
    }
    if !args.temperature.is_finite() || args.temperature < MIN_TEMPERATURE {
        bail!(
            "Temperature must be at least {}°C, got {}",
            MIN_TEMPERATURE,
            args.temperature
        );
    }
    Ok(())
}

/// Run one prediction and print the result
pub fn predict_yield(config: &PipelineConfig, args: PredictArgs, format: OutputFormat) -> Result<()> {
    validate_inputs(&args)?;

    let pipeline = YieldPipeline::from_config(config)?;
    let model = match args.model {
        Some(model) => model,
        None => pipeline
            .registry()
            .entries()
            .first()
            .map(|entry| entry.name.clone())
            .context("No models are registered")?,
    };

    let request = PredictionRequest {
        area: args.area,
        crop: args.crop,
        rainfall: args.rainfall,
        pesticides: args.pesticides,
        temperature: args.temperature,
        model,
    };
    let result = pipeline.predict(&request)?;

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Table => {
            println!(
                "\n{} {} in {}\n",
                "Crop Yield Prediction:".bold(),
                request.crop.cyan(),
                request.area.cyan()
            );
            if result.is_ensemble() {
                let rows: Vec<ConstituentRow> = result
                    .constituents
                    .iter()
                    .map(|c| ConstituentRow {
                        model: c.model.clone(),
                        prediction: format_yield(c.value),
                    })
                    .collect();
                print_table(&rows, format);
                println!();
            }
            print_success(&format!(
                "The predicted crop yield using {} is: {}",
                result.label.bold(),
                format_yield(result.value).green()
            ));
        }
    }

    Ok(())
}
