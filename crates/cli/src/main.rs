//! Student Performance Predictor CLI
//!
//! A command-line tool for requesting pass/fail predictions, inspecting the
//! active model and managing the decision threshold.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, model, predict, threshold};
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Student Performance Predictor CLI
#[derive(Parser)]
#[command(name = "spp")]
#[command(author, version, about = "CLI for the Student Performance Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via SPP_API_URL env var)
    #[arg(long, env = "SPP_API_URL")]
    pub api_url: Option<String>,

    /// Admin bearer token for protected routes
    #[arg(long, env = "SPP_ADMIN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict pass/fail for one student
    Predict {
        /// Attendance percentage (0-100)
        #[arg(long)]
        attendance: f64,

        /// Marks (0-100)
        #[arg(long)]
        marks: f64,

        /// Internal assessment score (0-30)
        #[arg(long)]
        internal_score: f64,

        /// Final exam score (0-100)
        #[arg(long)]
        final_exam_score: Option<f64>,

        /// Decision threshold for this request only
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Predict for every record in a JSON file (admin)
    PredictBatch {
        /// JSON file with an array of records or {"items": [...]}
        #[arg(long)]
        file: PathBuf,

        /// Decision threshold for this batch only
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Inspect or reload the active model
    #[command(subcommand)]
    Model(ModelCommands),

    /// Show or change the decision threshold (admin)
    #[command(subcommand)]
    Threshold(ThresholdCommands),

    /// Show service health and readiness
    Health,
}

#[derive(Subcommand)]
pub enum ModelCommands {
    /// Show feature importances of the active model
    Explain,

    /// Re-read the model artifacts on the server (admin)
    Reload,
}

#[derive(Subcommand)]
pub enum ThresholdCommands {
    /// Show the effective threshold and where it comes from
    Get,

    /// Store a new user threshold
    Set {
        /// Threshold strictly between 0 and 1
        value: f64,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    // Flags and env vars override the config file
    let api_url = cli
        .api_url
        .or(config.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let format = cli
        .format
        .or_else(|| config.default_format.as_deref().and_then(output::OutputFormat::from_name))
        .unwrap_or_default();

    let client = client::ApiClient::new(&api_url)?.with_token(cli.token.or(config.admin_token));

    match cli.command {
        Commands::Predict {
            attendance,
            marks,
            internal_score,
            final_exam_score,
            threshold,
        } => {
            let request = client::PredictRequest {
                attendance,
                marks,
                internal_score,
                final_exam_score,
                threshold,
            };
            predict::predict(&client, request, format).await?;
        }
        Commands::PredictBatch { file, threshold } => {
            predict::predict_batch(&client, &file, threshold, format).await?;
        }
        Commands::Model(model_cmd) => match model_cmd {
            ModelCommands::Explain => model::explain(&client, format).await?,
            ModelCommands::Reload => model::reload(&client, format).await?,
        },
        Commands::Threshold(threshold_cmd) => match threshold_cmd {
            ThresholdCommands::Get => threshold::get(&client, format).await?,
            ThresholdCommands::Set { value } => threshold::set(&client, value, format).await?,
        },
        Commands::Health => health::show(&client, format).await?,
    }

    Ok(())
}
