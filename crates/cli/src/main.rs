//! raglab CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP gateway
//! - `ingest`: Rebuild the vector index from the data directory
//! - `sources`: List indexed source documents
//! - `ask`: Answer one question, streaming to stdout
//! - `config`: Show or validate configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "raglab",
    about = "raglab: retrieval-augmented portfolio assistant",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $RAGLAB_CONFIG, then ./raglab.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Rebuild the vector index from the data directory
    Ingest,

    /// List indexed source documents
    Sources,

    /// Ask a single question and stream the answer
    Ask {
        /// The question
        query: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets masked)
    Show,
    /// Load and validate the configuration
    Validate,
    /// Print a default raglab.toml
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config;

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(config_path, port, host).await?,
        Commands::Ingest => commands::ingest::run(config_path).await?,
        Commands::Sources => commands::sources::run(config_path).await?,
        Commands::Ask { query } => commands::ask::run(config_path, query).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
            ConfigAction::Init => commands::config_cmd::init(),
        },
    }

    Ok(())
}
