//! # Onboarding manual RAG CLI (`onboard`)
//!
//! Stores onboarding manuals, indexes them into the vector store, retrieves
//! the chunks closest to a question, and serves the same operations over
//! HTTP.
//!
//! ## Usage
//!
//! ```bash
//! onboard --config ./config/onboard.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `onboard init` | Create the SQLite database and run schema migrations |
//! | `onboard manual add <file>` | Store a manual JSON file (`--index` to index it) |
//! | `onboard manual show <id>` | Print a stored manual |
//! | `onboard index <id>` | Index a stored manual (or `--file`) |
//! | `onboard retrieve <id> "<query>"` | Nearest chunks of a manual |
//! | `onboard tone "<text>"` | Classify a tone description |
//! | `onboard serve` | Start the HTTP server |

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use onboard_rag::config::{self, Config};
use onboard_rag::migrate;
use onboard_rag::models::IndexReport;
use onboard_rag::pipeline::Pipeline;
use onboard_rag::server;
use onboard_rag::tone::classify_tone;

/// Onboarding manual RAG service: index manuals, retrieve grounding context.
#[derive(Parser)]
#[command(name = "onboard", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/onboard.toml")]
    config: PathBuf,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Manage stored manuals.
    Manual {
        #[command(subcommand)]
        action: ManualAction,
    },

    /// Index a manual: chunk it, embed every chunk, store the vectors.
    Index {
        manual_id: i64,

        /// Read the manual from this JSON file instead of the stored snapshot.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Retrieve the chunks of a manual nearest to a query.
    Retrieve {
        manual_id: i64,

        query: String,

        /// Number of chunks; defaults to `[retrieval].default_limit`.
        #[arg(long)]
        limit: Option<usize>,

        /// Print the results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify a tone description (formal, dialect, casual, ...).
    Tone { text: String },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum ManualAction {
    /// Store a manual JSON file and print its id.
    Add {
        file: PathBuf,

        /// Index the manual right after storing it.
        #[arg(long)]
        index: bool,
    },
    /// Print a stored manual.
    Show { id: i64 },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // Logs go to stderr; stdout carries command output.
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn read_manual_file(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manual file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Manual file is not valid JSON: {}", path.display()))
}

fn print_report(report: &IndexReport) {
    println!(
        "manual {}: {} chunks, {} embedded, {} unchanged, {} failed, {} stale removed",
        report.manual_id,
        report.chunks,
        report.embedded,
        report.reused,
        report.failed,
        report.pruned
    );
}

async fn connect(cfg: &Config) -> Result<Pipeline> {
    Pipeline::connect(cfg).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    // Commands that don't require config
    let command = match cli.command {
        Commands::Tone { text } => {
            println!("{}", classify_tone(&text));
            return Ok(());
        }
        other => other,
    };

    let cfg = config::load_config(&cli.config)?;

    match command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Manual { action } => match action {
            ManualAction::Add { file, index } => {
                let body = read_manual_file(&file)?;
                let pipeline = connect(&cfg).await?;
                let id = pipeline.manuals().create(&body).await?;
                println!("Stored manual {}", id);
                if index {
                    let report = pipeline.index_manual(id, Some(&body)).await?;
                    print_report(&report);
                }
            }
            ManualAction::Show { id } => {
                let pipeline = connect(&cfg).await?;
                match pipeline.manuals().get_snapshot(id).await? {
                    Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                    None => anyhow::bail!("manual {} not found", id),
                }
            }
        },
        Commands::Index { manual_id, file } => {
            let body = file.as_deref().map(read_manual_file).transpose()?;
            let pipeline = connect(&cfg).await?;
            let report = pipeline.index_manual(manual_id, body.as_ref()).await?;
            print_report(&report);
        }
        Commands::Retrieve {
            manual_id,
            query,
            limit,
            json,
        } => {
            let pipeline = connect(&cfg).await?;
            let results = pipeline.retrieve(manual_id, &query, limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No results.");
            } else {
                for (i, r) in results.iter().enumerate() {
                    println!(
                        "{}. [{}] (distance {:.4}) {}",
                        i + 1,
                        r.chunk.kind(),
                        r.distance,
                        r.chunk.render().replace('\n', "\n   ")
                    );
                }
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Tone { .. } => {}
    }

    Ok(())
}
