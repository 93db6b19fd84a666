//! Configuration management for the siteindex service.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.

use crate::core::crawler::{CrawlOptions, RetryPolicy};
use crate::core::error::{Result, SiteIndexError};
use crate::core::xdg::XdgDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Crawl configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Sites crawled in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Folders (or mailboxes) listed in parallel within one site
    #[serde(default = "default_folder_concurrency")]
    pub folder_concurrency: usize,

    /// Retries after a rate-limited or unavailable response
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// Discovery cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

/// Pagination and query limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Requested limits above this are clamped
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// JSON fixture served by the built-in provider
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

// Default value functions
fn default_concurrency() -> usize {
    5
}

fn default_folder_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_page_size() -> usize {
    50
}

fn default_max_page_size() -> usize {
    500
}

fn default_max_query_length() -> usize {
    500
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            folder_concurrency: default_folder_concurrency(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_query_length: default_max_query_length(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl CrawlConfig {
    /// Scheduler settings derived from this section
    pub fn options(&self) -> CrawlOptions {
        CrawlOptions {
            concurrency: self.concurrency,
            folder_concurrency: self.folder_concurrency,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
                max_delay: Duration::from_millis(self.retry_max_delay_ms),
            },
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            SiteIndexError::ConfigError(format!("Failed to read config file: {e}"))
        })?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// Priority order:
    /// 1. SITEINDEX_CONFIG env var
    /// 2. XDG config file (~/.config/siteindex/config.toml)
    /// 3. ./siteindex.toml
    /// 4. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("SITEINDEX_CONFIG") {
            Self::from_file(config_path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else if Path::new("siteindex.toml").exists() {
                Self::from_file("siteindex.toml")?
            } else {
                Self::default()
            }
        };

        config.merge_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        // Crawl configuration
        override_from_env("SITEINDEX_CRAWL_CONCURRENCY", &mut self.crawl.concurrency);
        override_from_env(
            "SITEINDEX_FOLDER_CONCURRENCY",
            &mut self.crawl.folder_concurrency,
        );
        override_from_env("SITEINDEX_MAX_RETRIES", &mut self.crawl.max_retries);

        // Cache configuration
        override_from_env("SITEINDEX_CACHE_TTL_SECONDS", &mut self.cache.ttl_seconds);

        // Pagination configuration
        override_from_env(
            "SITEINDEX_DEFAULT_PAGE_SIZE",
            &mut self.pagination.default_page_size,
        );
        override_from_env("SITEINDEX_MAX_PAGE_SIZE", &mut self.pagination.max_page_size);

        // Server configuration; PORT is the platform-provided fallback
        if let Ok(host) = env::var("SITEINDEX_HOST") {
            self.server.host = host;
        }
        override_from_env("PORT", &mut self.server.port);
        override_from_env("SITEINDEX_PORT", &mut self.server.port);

        // Provider configuration
        if let Ok(fixture) = env::var("SITEINDEX_FIXTURE") {
            self.provider.fixture = Some(PathBuf::from(fixture));
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.crawl.concurrency == 0 {
            return Err(SiteIndexError::ConfigError(
                "Crawl concurrency must be non-zero".to_string(),
            ));
        }

        if self.crawl.folder_concurrency == 0 {
            return Err(SiteIndexError::ConfigError(
                "Folder concurrency must be non-zero".to_string(),
            ));
        }

        if self.crawl.retry_base_delay_ms > self.crawl.retry_max_delay_ms {
            return Err(SiteIndexError::ConfigError(
                "Retry base delay cannot exceed retry max delay".to_string(),
            ));
        }

        if self.cache.ttl_seconds == 0 {
            return Err(SiteIndexError::ConfigError(
                "Cache TTL must be non-zero".to_string(),
            ));
        }

        if self.pagination.default_page_size == 0 || self.pagination.max_page_size == 0 {
            return Err(SiteIndexError::ConfigError(
                "Page sizes must be non-zero".to_string(),
            ));
        }

        if self.pagination.default_page_size > self.pagination.max_page_size {
            return Err(SiteIndexError::ConfigError(
                "Default page size cannot exceed max page size".to_string(),
            ));
        }

        if self.pagination.max_query_length == 0 {
            return Err(SiteIndexError::ConfigError(
                "Max query length must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Log the effective configuration
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Crawl concurrency: {} sites", self.crawl.concurrency);
        tracing::info!(
            "  Folder concurrency: {} per site",
            self.crawl.folder_concurrency
        );
        tracing::info!(
            "  Retries: {} (backoff {}ms..{}ms)",
            self.crawl.max_retries,
            self.crawl.retry_base_delay_ms,
            self.crawl.retry_max_delay_ms
        );
        tracing::info!("  Cache TTL: {}s", self.cache.ttl_seconds);
        tracing::info!(
            "  Page size: {} (max {})",
            self.pagination.default_page_size,
            self.pagination.max_page_size
        );
        tracing::info!("  Max query length: {}", self.pagination.max_query_length);
        tracing::info!("  Listen: {}:{}", self.server.host, self.server.port);
        match &self.provider.fixture {
            Some(path) => tracing::info!("  Provider fixture: {:?}", path),
            None => tracing::info!("  Provider fixture: none"),
        }
    }
}

fn override_from_env<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(raw) = env::var(key) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("Ignoring {}={:?}: not a valid value", key, raw),
        }
    }
}
