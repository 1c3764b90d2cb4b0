//! Thyroid Diagnosis Relay CLI
//!
//! Runs one diagnosis through the local classifier, or inspects the
//! health of a running diagnosis server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{diagnose, status};

/// Thyroid Diagnosis Relay CLI
#[derive(Parser)]
#[command(name = "dxctl")]
#[command(author, version, about = "CLI for the Thyroid Diagnosis Relay", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Diagnose one feature vector with the local classifier
    Diagnose {
        /// The five feature values c0..c4
        #[arg(
            num_args = 5,
            required = true,
            allow_negative_numbers = true,
            value_names = ["C0", "C1", "C2", "C3", "C4"]
        )]
        values: Vec<String>,

        /// Classifier executable (default from config file, else ../neuralnet)
        #[arg(long, env = "DXCTL_CLASSIFIER")]
        classifier: Option<String>,

        /// Argument placed before the prediction flags (repeatable), e.g. a
        /// script when `--classifier` names an interpreter
        #[arg(long = "classifier-arg", value_name = "ARG", allow_hyphen_values = true)]
        classifier_args: Vec<String>,

        /// Directory of the trained network (default from config file, else ../thyroidologist)
        #[arg(long, env = "DXCTL_MODEL_DIR")]
        model_dir: Option<String>,

        /// Seconds to wait for the classifier
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// Show health and readiness of a running server
    Status {
        /// Server URL (default from config file, else http://localhost:3000)
        #[arg(long, env = "DXCTL_SERVER_URL")]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    match cli.command {
        Commands::Diagnose {
            values,
            classifier,
            classifier_args,
            model_dir,
            timeout,
        } => {
            let classifier = classifier.unwrap_or_else(|| config.classifier_path());
            let model_dir = model_dir.unwrap_or_else(|| config.model_dir());
            diagnose::run(
                &values,
                &classifier,
                &classifier_args,
                &model_dir,
                timeout,
                cli.format,
            )
            .await?;
        }
        Commands::Status { server } => {
            let server = server.unwrap_or_else(|| config.server_url());
            let client = client::ApiClient::new(&server)?;
            status::show_status(&client, cli.format).await?;
        }
    }

    Ok(())
}
