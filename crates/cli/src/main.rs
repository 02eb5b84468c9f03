//! RetailGenie CLI
//!
//! Main entry point for the retailgenie command-line tool.
//! Indexes product catalogs into a local vector store and searches them.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    ClearCommand, DeleteCommand, IndexCommand, RecommendCommand, SearchCommand, StatsCommand,
};
use retailgenie_core::{config::AppConfig, logging, AppResult, StoreBackend};
use std::path::PathBuf;

/// RetailGenie - local product embeddings and semantic search
#[derive(Parser, Debug)]
#[command(name = "retailgenie")]
#[command(about = "Local product embeddings and semantic search", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RETAILGENIE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RETAILGENIE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Vector store backend (sqlite, json)
    #[arg(long, global = true, env = "VECTOR_STORE")]
    store: Option<StoreBackend>,

    /// Index file path (default: .retailgenie/data/embeddings_index.<ext>)
    #[arg(long, global = true, env = "VECTOR_DB_PATH")]
    index_path: Option<PathBuf>,

    /// Embedding provider (trigram, openai)
    #[arg(long, global = true, env = "EMBEDDINGS_PROVIDER")]
    provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed a products file into the vector index
    Index(IndexCommand),

    /// Semantic product search
    Search(SearchCommand),

    /// Same-category recommendations for a product
    Recommend(RecommendCommand),

    /// Delete one record by key
    Delete(DeleteCommand),

    /// Remove every record from the index
    Clear(ClearCommand),

    /// Show index statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Workspace and config file decide which config.yaml is read
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?.with_overrides(
        cli.workspace,
        cli.store,
        cli.index_path,
        cli.provider,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("RetailGenie CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Index: {:?}", config.index_config());

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Search(_) => "search",
        Commands::Recommend(_) => "recommend",
        Commands::Delete(_) => "delete",
        Commands::Clear(_) => "clear",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Recommend(cmd) => cmd.execute(&config).await,
        Commands::Delete(cmd) => cmd.execute(&config).await,
        Commands::Clear(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
