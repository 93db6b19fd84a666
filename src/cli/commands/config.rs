//! Config command - show current configuration

use crate::cli::output;
use crate::cli::OutputFormat;
use crate::core::config::Config;
use crate::core::xdg::XdgDirs;
use clap::Args;
use serde::Serialize;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {}

/// Configuration response
#[derive(Debug, Serialize)]
pub struct ConfigResponse<'a> {
    pub config_file: String,
    #[serde(flatten)]
    pub config: &'a Config,
}

/// Execute the config command
pub fn execute(
    _args: ConfigArgs,
    config: &Config,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_file = std::env::var("SITEINDEX_CONFIG")
        .unwrap_or_else(|_| XdgDirs::new().config_file().to_string_lossy().into_owned());

    let response = ConfigResponse {
        config_file,
        config,
    };

    match format {
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  config_file: {}", response.config_file);
            println!("  crawl:");
            println!("    concurrency: {}", config.crawl.concurrency);
            println!("    folder_concurrency: {}", config.crawl.folder_concurrency);
            println!("    max_retries: {}", config.crawl.max_retries);
            println!(
                "    retry_delay_ms: {}..{}",
                config.crawl.retry_base_delay_ms, config.crawl.retry_max_delay_ms
            );
            println!("  cache:");
            println!("    ttl_seconds: {}", config.cache.ttl_seconds);
            println!("  pagination:");
            println!(
                "    default_page_size: {}",
                config.pagination.default_page_size
            );
            println!("    max_page_size: {}", config.pagination.max_page_size);
            println!(
                "    max_query_length: {}",
                config.pagination.max_query_length
            );
            println!("  server:");
            println!("    host: {}", config.server.host);
            println!("    port: {}", config.server.port);
            println!("  provider:");
            match &config.provider.fixture {
                Some(path) => println!("    fixture: {}", path.display()),
                None => println!("    fixture: (none)"),
            }
        }
        OutputFormat::Json => {
            output::print_json(&response)?;
        }
    }

    Ok(())
}
