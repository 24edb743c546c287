//! regattest - regulation validation and attestation
//!
//! Runs validation requests against a local regulation fixture file. Remote
//! validators are configured in the YAML config (feature `http`); without
//! them every request is answered by the local fallback validator.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use regattest_core::{RegulationSnapshot, ValidationLevel};
use regattest_runtime::{InMemoryRegulationStore, Orchestrator, RegulationFilter, RuntimeConfig};

/// regattest - regulation validation and attestation
#[derive(Parser, Debug)]
#[command(name = "regattest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to runtime configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON array of regulation records serving as the authoritative store
    #[arg(short, long, default_value = "regulations.json")]
    regulations: PathBuf,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate one request (JSON file, or - for stdin)
    Validate {
        /// Request file
        request: PathBuf,
    },

    /// Validate a JSON array of requests concurrently
    Batch {
        /// Requests file
        requests: PathBuf,
    },

    /// Show how a regulation would be classified
    Classify {
        /// Regulation id
        regulation_id: String,

        /// Requested level (1-3)
        #[arg(
            short,
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u8).range(1..=3)
        )]
        level: u8,
    },

    /// List regulations in the store
    #[command(alias = "ls")]
    Regulations {
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        jurisdiction: Option<String>,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Check that the store is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = match &cli.config {
        Some(path) => RuntimeConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RuntimeConfig::default(),
    };

    let snapshots = load_regulations(&cli.regulations)?;

    let orchestrator = Orchestrator::builder()
        .config(config)
        .store(Arc::new(InMemoryRegulationStore::with_regulations(snapshots)))
        .build()
        .context("Failed to build orchestrator")?;

    let outcome = run(&orchestrator, cli.command).await;
    orchestrator.shutdown().await;
    outcome
}

async fn run(orchestrator: &Orchestrator, command: Commands) -> Result<()> {
    match command {
        Commands::Validate { request } => {
            let raw = read_json(&request)?;
            match orchestrator.validate_json(&raw).await {
                Ok(response) => print_json(&response),
                Err(e) => {
                    print_json(&e.to_item_error())?;
                    bail!("Validation failed: {e}");
                }
            }
        }
        Commands::Batch { requests } => {
            let raw = read_json(&requests)?;
            let Value::Array(items) = raw else {
                bail!("{} must contain a JSON array of requests", requests.display());
            };
            print_json(&orchestrator.validate_batch(&items).await)
        }
        Commands::Classify {
            regulation_id,
            level,
        } => {
            let requested = ValidationLevel::try_from(level)?;
            let classification = orchestrator
                .classify(&regulation_id, requested)
                .await
                .with_context(|| format!("Failed to classify {regulation_id}"))?;
            print_json(&classification)
        }
        Commands::Regulations {
            category,
            jurisdiction,
            page,
            limit,
        } => {
            let filter = RegulationFilter {
                category,
                jurisdiction,
            };
            let listing = orchestrator
                .list_regulations(&filter, page, limit)
                .await
                .context("Failed to list regulations")?;
            print_json(&listing)
        }
        Commands::Health => {
            orchestrator
                .health()
                .await
                .context("Regulation store is unhealthy")?;
            println!("ok");
            Ok(())
        }
    }
}

fn load_regulations(path: &Path) -> Result<Vec<RegulationSnapshot>> {
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "Regulation file not found, starting with an empty store"
        );
        return Ok(Vec::new());
    }
    let raw = read_json(path)?;
    serde_json::from_value(raw)
        .with_context(|| format!("{} is not a JSON array of regulations", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    let content = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
