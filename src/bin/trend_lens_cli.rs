//! Command-line entrypoint for one-off analyses.
//!
//! Runs the same pipeline as the HTTP server against the configured data directory and prints
//! results as pretty JSON. Set `RUST_LOG=warn` to keep stdout limited to the JSON output.
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use trendlens::{analysis::Analyzer, config, logging};

#[derive(Parser)]
#[command(
    name = "trend-lens-cli",
    about = "Cluster scraped social content and extract product insights"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a batch file from the data directory.
    Analyze {
        /// Batch file name, e.g. `reddit_batch.json`.
        batch: String,
        /// Text-generation model (defaults to `ANALYSIS_MODEL`).
        #[arg(long)]
        model: Option<String>,
    },
    /// Print a previously persisted analysis.
    Show {
        /// Analysis file name, e.g. `reddit_batch_analysis.json`.
        name: String,
    },
    /// List installed text-generation models.
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing();

    let outcome = run(cli.command).await;
    logging::shutdown_tracing();
    outcome
}

async fn run(command: Command) -> Result<()> {
    let analyzer =
        Analyzer::from_config(config::get_config()).context("failed to build analyzer")?;

    match command {
        Command::Analyze { batch, model } => {
            let envelope = analyzer.analyze(&batch, model.as_deref()).await;
            print_json(&envelope)?;
            if !envelope.success {
                bail!(
                    "analysis of {batch} failed: {}",
                    envelope.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        Command::Show { name } => {
            let result = analyzer
                .load_analysis(&name)
                .await
                .with_context(|| format!("failed to load analysis {name}"))?;
            print_json(&result)?;
        }
        Command::Models => {
            let models = analyzer.list_models().await;
            print_json(&serde_json::json!({ "models": models }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}
