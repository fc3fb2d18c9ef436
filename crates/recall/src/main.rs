// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recall - memory activation and retrieval from the command line.
//!
//! Memories are read from a text file, one per line, into a volatile store
//! that lives for the duration of the command.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod corpus;
mod query;
mod stats;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use recall_config::RecallConfig;
use recall_core::{ContextType, RecallError};

/// Recall - surface the memories that matter for a context.
#[derive(Parser, Debug)]
#[command(name = "recall", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the commands that score memories against a text.
#[derive(Args, Debug)]
struct QueryArgs {
    /// File with one memory per line.
    #[arg(short, long)]
    memories: PathBuf,
    /// Context type of the query (conversation, document, task, query, mixed).
    #[arg(short = 't', long = "type", default_value = "mixed")]
    context_type: String,
    /// Output JSON instead of a table.
    #[arg(long)]
    json: bool,
    /// Disable colors.
    #[arg(long)]
    plain: bool,
    /// Query text.
    text: String,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Decide which memories to retrieve for a query.
    Query {
        #[command(flatten)]
        args: QueryArgs,
        /// Show skipped memories as well.
        #[arg(long)]
        all: bool,
    },
    /// List every memory as a ranked candidate.
    Candidates {
        #[command(flatten)]
        args: QueryArgs,
        /// Ranking strategy (activation_score, recency, access_frequency,
        /// combined, relevance_boost). Defaults to the configured one.
        #[arg(short, long)]
        strategy: Option<String>,
        /// Show at most this many candidates.
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show store statistics and embedder health.
    Stats {
        /// File with one memory per line.
        #[arg(short, long)]
        memories: Option<PathBuf>,
        /// Output JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the structural fingerprint of a text.
    Fingerprint {
        /// Context type of the text.
        #[arg(short = 't', long = "type", default_value = "mixed")]
        context_type: String,
        /// Text to fingerprint.
        text: String,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration as TOML.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => recall_config::load_and_validate_path(path),
        None => recall_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            recall_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.engine.log_level);

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &RecallConfig) -> Result<(), RecallError> {
    match command {
        Commands::Query { args, all } => {
            let context_type = parse_context_type(&args.context_type)?;
            let options = query::QueryOptions {
                all,
                json: args.json,
                plain: args.plain,
            };
            query::run_query(config, &args.memories, &args.text, context_type, options).await
        }
        Commands::Candidates {
            args,
            strategy,
            limit,
        } => {
            let context_type = parse_context_type(&args.context_type)?;
            let options = query::CandidateOptions {
                strategy,
                limit,
                json: args.json,
                plain: args.plain,
            };
            query::run_candidates(config, &args.memories, &args.text, context_type, options).await
        }
        Commands::Stats { memories, json } => {
            stats::run_stats(config, memories.as_deref(), json).await
        }
        Commands::Fingerprint { context_type, text } => {
            let context_type = parse_context_type(&context_type)?;
            query::run_fingerprint(config, &text, context_type).await
        }
        Commands::Config { action } => match action {
            ConfigCommands::Show => {
                let rendered = toml::to_string_pretty(config).map_err(|e| {
                    RecallError::Internal(format!("failed to render configuration: {e}"))
                })?;
                print!("{rendered}");
                Ok(())
            }
            ConfigCommands::Validate => {
                println!("recall: configuration is valid");
                Ok(())
            }
        },
    }
}

/// Strict parsing for user input; unknown names are rejected rather than
/// silently treated as `mixed`.
fn parse_context_type(name: &str) -> Result<ContextType, RecallError> {
    name.trim()
        .parse()
        .map_err(|_| RecallError::InvalidConfiguration {
            key: "type".to_string(),
            reason: format!(
                "unknown context type '{name}' (expected conversation, document, task, query or mixed)"
            ),
        })
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("recall={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
