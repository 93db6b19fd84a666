//! CLI adapter for siteindex
//!
//! Provides the command-line interface: run the HTTP server, run a
//! one-off crawl in-process, inspect configuration.
//! This module is parallel to `http/` - both depend on `core/` but not on each other.
//!
//! # Architecture
//!
//! ```text
//!              +------------------+
//!              |     core/        |
//!              |  (domain logic)  |
//!              +--------+---------+
//!                       |
//!          +------------+------------+
//!          |                         |
//!          v                         v
//! +------------------+      +------------------+
//! |      http/       |      |      cli/        |
//! | (axum adapter)   |      | (clap adapter)   |
//! +------------------+      +------------------+
//! ```

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// siteindex - crawl and index document sites and mailboxes
///
/// Crawls a tenant's document libraries and mailbox attachments,
/// keeps an incremental in-memory index, and serves listing and search.
#[derive(Parser, Debug)]
#[command(name = "siteindex")]
#[command(version)]
#[command(about = "Crawl-and-index engine for document sites", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Log line format (logs go to stderr)
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server
    Serve(commands::ServeArgs),

    /// Run one indexing job in-process and print the resulting stats
    Crawl(commands::CrawlArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  siteindex completions bash > ~/.local/share/bash-completion/completions/siteindex
    ///   zsh:   siteindex completions zsh > ~/.zfunc/_siteindex
    ///   fish:  siteindex completions fish > ~/.config/fish/completions/siteindex.fish
    Completions(commands::CompletionsArgs),
}

impl Commands {
    /// Log filter used when RUST_LOG is unset
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            Commands::Serve(_) => "siteindex=info",
            _ => "siteindex=warn",
        }
    }
}

/// Install the global tracing subscriber writing to stderr
pub fn init_logging(format: LogFormat, default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {e}");
    }
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;

    // Handle completions command early (doesn't need config)
    if let Commands::Completions(args) = cli.command {
        return commands::completions::execute(args);
    }

    // Load configuration
    let config = Config::load()?;

    // Execute command
    match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Crawl(args) => commands::crawl::execute(args, config, cli.format).await,
        Commands::ShowConfig(args) => commands::config::execute(args, &config, cli.format),
        Commands::Completions(_) => unreachable!(), // Handled above
    }
}
