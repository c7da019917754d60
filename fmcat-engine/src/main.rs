//! fmcat - failure-mode catalog builder
//!
//! Reads failure records from JSON, runs the catalog pipeline against the
//! SQLite library store and writes either the load sheet or the conflicts
//! that need a decision.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fmcat_common::config::load_or_default;
use fmcat_common::events::EventBus;
use fmcat_engine::config::build_orchestrator;
use fmcat_engine::db::{CatalogStore, SqliteStore};
use fmcat_engine::models::{RawRecord, Resolution};
use fmcat_engine::services::ProviderHealthRegistry;
use fmcat_engine::workflow::{CatalogPipeline, PipelineOutcome};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "fmcat", version, about = "Build failure-mode catalog load sheets")]
struct Cli {
    /// Config file (overrides FMCAT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the pipeline over a batch of records
    Run {
        /// JSON array of failure records
        #[arg(long)]
        input: PathBuf,

        /// Where to write the load sheet or pending conflicts
        #[arg(long)]
        output: PathBuf,

        /// JSON object mapping conflict id to resolution, applied first
        #[arg(long)]
        resolutions: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting fmcat v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let store: Arc<dyn CatalogStore> = Arc::new(SqliteStore::open(&db_path).await?);

    let events = EventBus::default();
    let orchestrator = build_orchestrator(&config, ProviderHealthRegistry::new(), events.clone());
    let mut pipeline = CatalogPipeline::open(store, orchestrator, events)
        .await?
        .with_taxonomy_threshold(config.fuzzy.taxonomy_threshold);

    match cli.command {
        Command::Run {
            input,
            output,
            resolutions,
        } => {
            if let Some(path) = resolutions {
                let decisions: HashMap<Uuid, Resolution> = read_json(&path)?;
                let remaining = pipeline.resolve(decisions).await?;
                if !remaining.is_empty() {
                    warn!(remaining = remaining.len(), "Conflicts still unresolved");
                }
            }

            let records: Vec<RawRecord> = read_json(&input)?;
            info!(records = records.len(), input = %input.display(), "Loaded records");

            let outcome = pipeline.run(&records).await?;
            match &outcome {
                PipelineOutcome::Completed { rows } => {
                    info!(rows = rows.len(), output = %output.display(), "Writing load sheet");
                }
                PipelineOutcome::AwaitingResolution { stage, conflicts } => {
                    warn!(
                        %stage,
                        conflicts = conflicts.len(),
                        output = %output.display(),
                        "Conflicts need resolution; rerun with --resolutions"
                    );
                }
            }
            write_json(&output, &outcome)?;

            if !pipeline.telemetry().is_empty() {
                info!(generated = pipeline.telemetry().len(), "Provider-generated component codes");
            }
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
