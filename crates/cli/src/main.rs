//! LexRAG CLI
//!
//! Main entry point for the lexrag command-line tool.
//! Answers questions over a private corpus of legal documents with
//! retrieval-augmented generation.

mod commands;

use clap::{Parser, Subcommand};
use commands::{IngestCommand, QueryCommand, StatsCommand};
use lexrag_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// LexRAG CLI - question answering over legal documents with local RAG
#[derive(Parser, Debug)]
#[command(name = "lexrag")]
#[command(about = "Question answering over legal documents with RAG", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the persisted index (default: ./index)
    #[arg(short, long, global = true, env = "LEXRAG_INDEX_DIR")]
    index_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest documents into the index
    Ingest(IngestCommand),

    /// Ask a question against the indexed corpus
    Query(QueryCommand),

    /// Show engine statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Load base configuration from file and environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.index_dir,
        None,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("LexRAG CLI starting");
    tracing::debug!("Index dir: {:?}", config.index_dir);
    tracing::debug!(
        "Providers: embedding={}, llm={}",
        config.embedding_provider,
        config.llm_provider
    );

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Query(_) => "query",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
