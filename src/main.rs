//! Command-line interface for fake-source
//!
//! # Usage Examples
//!
//! ## Batch run
//! ```bash
//! fake-source run --config fake.yaml --output rows.jsonl
//!
//! # Only some columns, two readers
//! fake-source run --config fake.yaml --columns id,email --parallelism 2
//! ```
//!
//! ## Streaming run with checkpoints
//! ```bash
//! fake-source run --config fake.yaml --job-mode streaming \
//!   --checkpoint-dir .fake-source-checkpoints \
//!   --checkpoint-interval 30s
//!
//! # After a restart, continue from the newest checkpoint
//! fake-source run --config fake.yaml --job-mode streaming \
//!   --checkpoint-dir .fake-source-checkpoints --restore
//! ```
//!
//! ## Inspecting a configuration
//! ```bash
//! fake-source validate --config fake.yaml
//! fake-source tables --config fake.yaml
//! ```

use anyhow::Context;
use checkpoint::{CheckpointManager, FilesystemStore};
use clap::{Parser, Subcommand};
use fake_source::{
    parse_duration, FakeSource, JobMode, JsonLinesSink, LocalRuntime, RunSummary, RuntimeOptions,
    SourceConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "fake-source")]
#[command(about = "Deterministic synthetic data source with checkpointed parallel splits")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate rows and write them as JSON Lines
    Run {
        /// Source configuration file (YAML)
        #[arg(long, env = "FAKE_SOURCE_CONFIG")]
        config: PathBuf,

        /// Job mode; batch jobs stop after row_num rows
        #[arg(long, value_enum, default_value = "batch")]
        job_mode: JobMode,

        /// Number of readers (default: split_num)
        #[arg(long)]
        parallelism: Option<u32>,

        /// Directory to write checkpoint files
        #[arg(long, env = "FAKE_SOURCE_CHECKPOINT_DIR")]
        checkpoint_dir: Option<PathBuf>,

        /// Time between checkpoints, e.g. "30s" or "500ms"
        #[arg(long, requires = "checkpoint_dir")]
        checkpoint_interval: Option<String>,

        /// Number of checkpoint files to keep
        #[arg(long, default_value = "3")]
        checkpoint_retain: usize,

        /// Resume from the newest checkpoint in the checkpoint directory
        #[arg(long, requires = "checkpoint_dir")]
        restore: bool,

        /// Output file (default: stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Emit only these columns (comma-separated)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Validate a configuration and exit
    Validate {
        /// Source configuration file (YAML)
        #[arg(long, env = "FAKE_SOURCE_CONFIG")]
        config: PathBuf,
    },

    /// Print the tables a configuration produces
    Tables {
        /// Source configuration file (YAML)
        #[arg(long, env = "FAKE_SOURCE_CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            job_mode,
            parallelism,
            checkpoint_dir,
            checkpoint_interval,
            checkpoint_retain,
            restore,
            output,
            columns,
        } => {
            let source = FakeSource::prepare(&SourceConfig::from_file(&config)?, job_mode)?;
            let source = if columns.is_empty() {
                source
            } else {
                source.with_projection(&columns)?
            };

            let checkpoints = checkpoint_dir.map(|dir| {
                Arc::new(
                    CheckpointManager::new(Arc::new(FilesystemStore::new(dir)))
                        .with_retention(checkpoint_retain),
                )
            });
            let checkpoint_interval = checkpoint_interval
                .as_deref()
                .map(parse_duration)
                .transpose()
                .context("Invalid --checkpoint-interval")?;
            let options = RuntimeOptions {
                parallelism,
                checkpoints,
                checkpoint_interval,
                restore,
            };

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received interrupt, stopping");
                    on_signal.cancel();
                }
            });

            let schema = source.schema().clone();
            let runtime = LocalRuntime::new(source, options);
            let summary = match output {
                Some(path) => {
                    let file = tokio::fs::File::create(&path)
                        .await
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    runtime.run(JsonLinesSink::new(file, &schema), cancel).await?
                }
                None => {
                    runtime
                        .run(JsonLinesSink::new(tokio::io::stdout(), &schema), cancel)
                        .await?
                }
            };
            report(&summary);
        }
        Commands::Validate { config } => {
            let config = SourceConfig::from_file(&config)?;
            FakeSource::prepare(&config, JobMode::Batch)?;
            println!("Configuration is valid");
        }
        Commands::Tables { config } => {
            let source = FakeSource::prepare(&SourceConfig::from_file(&config)?, JobMode::Batch)?;
            for table in source.produced_tables() {
                let columns: Vec<String> = table
                    .schema
                    .columns()
                    .iter()
                    .map(|c| format!("{} {}", c.name, c.column_type))
                    .collect();
                println!("{}: {}", table.path, columns.join(", "));
            }
        }
    }

    Ok(())
}

fn report(summary: &RunSummary) {
    info!(
        "Generated {} records, {} checkpoints{}",
        summary.records,
        summary.checkpoints,
        summary
            .restored_from
            .map(|id| format!(", resumed from checkpoint {id}"))
            .unwrap_or_default()
    );
    if !summary.failed_splits.is_empty() {
        tracing::warn!("Failed splits: {:?}", summary.failed_splits);
    }
}
