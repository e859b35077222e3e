//! Crop Yield Predictor CLI
//!
//! A command-line host for the yield prediction pipeline: serve a
//! prediction from user inputs and inspect the loaded artifacts.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{inspect, predict};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yield_lib::CategoryField;

/// Crop Yield Predictor CLI
#[derive(Parser)]
#[command(name = "yield")]
#[command(author, version, about = "CLI for Crop Yield Predictor", long_about = None)]
pub struct Cli {
    /// Path to a configuration file (can also be set via YIELD_CONFIG env var)
    #[arg(long, env = "YIELD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the pre-fitted artifacts
    #[arg(long, env = "YIELD_ARTIFACT_DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict crop yield for one area and crop
    Predict {
        /// Country or region, as seen during training
        #[arg(long)]
        area: String,

        /// Crop type, as seen during training
        #[arg(long)]
        crop: String,

        /// Average rainfall in mm per year
        #[arg(long, default_value_t = 1500.0)]
        rainfall: f64,

        /// Pesticide use in tonnes
        #[arg(long, default_value_t = 100.0)]
        pesticides: f64,

        /// Average temperature in °C
        #[arg(long, default_value_t = 25.0, allow_negative_numbers = true)]
        temperature: f64,

        /// Model name or the ensemble label (defaults to the first registered model)
        #[arg(long)]
        model: Option<String>,
    },

    /// List the valid labels for a categorical field
    Classes {
        /// Field to list
        field: FieldArg,
    },

    /// List registered models
    Models,

    /// Show the model input feature order
    Features,

    /// Load every artifact and show its provenance
    Artifacts,
}

/// Categorical input field
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FieldArg {
    Area,
    Item,
}

impl From<FieldArg> for CategoryField {
    fn from(field: FieldArg) -> Self {
        match field {
            FieldArg::Area => CategoryField::Area,
            FieldArg::Item => CategoryField::Item,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref(), cli.artifact_dir)?;

    match cli.command {
        Commands::Predict {
            area,
            crop,
            rainfall,
            pesticides,
            temperature,
            model,
        } => {
            let args = predict::PredictArgs {
                area,
                crop,
                rainfall,
                pesticides,
                temperature,
                model,
            };
            predict::predict_yield(&config, args, cli.format)?;
        }
        Commands::Classes { field } => {
            inspect::show_classes(&config, field.into(), cli.format)?;
        }
        Commands::Models => {
            inspect::show_models(&config, cli.format);
        }
        Commands::Features => {
            inspect::show_features(&config, cli.format)?;
        }
        Commands::Artifacts => {
            inspect::show_artifacts(&config, cli.format)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_failure(&err);
            ExitCode::FAILURE
        }
    }
}
