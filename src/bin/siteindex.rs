//! siteindex - crawl-and-index engine
//!
//! Runs the HTTP API server or a one-off crawl from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Serve the API over a fixture tenant
//! siteindex serve --fixture tenant.json
//!
//! # Crawl two sites and print stats as JSON
//! siteindex --format json crawl --fixture tenant.json --site S1 --site S2:mail
//!
//! # Show configuration
//! siteindex show-config
//! ```

use clap::Parser;
use siteindex::cli::{init_logging, output, run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.command.default_log_filter());

    if let Err(e) = run(cli).await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}
