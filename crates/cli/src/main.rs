//! docrag CLI
//!
//! Builds a paragraph-level embedding index from a markdown corpus and
//! answers similarity queries against it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, IndexCommand, SearchCommand, ServeCommand, StatsCommand};
use docrag_core::logging::{self, LogFormat};
use docrag_core::{AppConfig, AppResult, ConfigOverrides};
use std::path::PathBuf;

/// docrag - retrieval over a markdown documentation corpus
#[derive(Parser, Debug)]
#[command(name = "docrag")]
#[command(about = "Embedding index and similarity search for markdown docs", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Embedding service base URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Embedding provider (ollama, mock)
    #[arg(long, global = true)]
    embedding_provider: Option<String>,

    /// Embedding model identifier
    #[arg(short = 'm', long, global = true)]
    embedding_model: Option<String>,

    /// Index file path or http(s) URL
    #[arg(short, long, global = true)]
    index: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk and embed the corpus, then write the index
    Index(IndexCommand),

    /// Rank indexed paragraphs against a query
    Search(SearchCommand),

    /// Answer a question from the closest paragraphs
    Ask(AskCommand),

    /// Show index statistics
    Stats(StatsCommand),

    /// Run the query-time proxy
    Serve(ServeCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_with(ConfigOverrides {
        workspace: cli.workspace,
        config_file: cli.config,
        endpoint: cli.endpoint,
        embedding_provider: cli.embedding_provider,
        embedding_model: cli.embedding_model,
        index: cli.index,
        log_level: cli.log_level,
        log_format: cli.log_format,
        verbose: cli.verbose,
        no_color: cli.no_color,
    })?;

    logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        config.log_format,
    )?;

    config.validate()?;

    tracing::info!("docrag starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(
        "Embedding: {} model '{}' at {}",
        config.embedding_provider,
        config.embedding_model,
        config.endpoint
    );

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Search(_) => "search",
        Commands::Ask(_) => "ask",
        Commands::Stats(_) => "stats",
        Commands::Serve(_) => "serve",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Serve(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "docrag",
            "search",
            "how do watchers work",
            "-k",
            "5",
            "--index",
            "https://example.com/index.json",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.index.as_deref(), Some("https://example.com/index.json"));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        match cli.command {
            Commands::Search(cmd) => {
                assert_eq!(cmd.query, "how do watchers work");
                assert_eq!(cmd.top_k, Some(5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let result = Cli::try_parse_from(["docrag", "--log-format", "xml", "stats"]);
        assert!(result.is_err());
    }
}
