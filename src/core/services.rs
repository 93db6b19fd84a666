//! Unified service container for siteindex
//!
//! Provides shared access to all core services.

use crate::core::cache::DiscoveryCache;
use crate::core::config::Config;
use crate::core::crawler::CrawlScheduler;
use crate::core::error::Result;
use crate::core::jobs::JobOrchestrator;
use crate::core::provider::{FixtureDocument, FixtureProvider, ProviderClient};
use crate::core::search::SearchService;
use crate::core::storage::IndexStore;
use std::sync::Arc;

/// Unified services container
///
/// All adapters use this same struct for service access.
#[derive(Clone)]
pub struct Services {
    /// In-memory index of crawled records
    pub store: Arc<IndexStore>,

    /// Memoized site and mailbox-user discovery
    pub cache: Arc<DiscoveryCache>,

    /// Owner of the single indexing job
    pub jobs: Arc<JobOrchestrator>,

    /// Search and listing over the index
    pub search: Arc<SearchService>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl Services {
    /// Wire services around an existing provider client
    pub fn new(config: Config, provider: Arc<dyn ProviderClient>) -> Self {
        let store = Arc::new(IndexStore::new(config.pagination.max_page_size));
        let cache = Arc::new(DiscoveryCache::new(config.cache.ttl()));

        let scheduler = CrawlScheduler::new(provider, Arc::clone(&cache), config.crawl.options());
        let jobs = Arc::new(JobOrchestrator::new(
            scheduler,
            Arc::clone(&store),
            Arc::clone(&cache),
        ));

        let search = Arc::new(SearchService::new(
            Arc::clone(&store),
            config.pagination.default_page_size,
            config.pagination.max_query_length,
        ));

        Self {
            store,
            cache,
            jobs,
            search,
            config: Arc::new(config),
        }
    }

    /// Create services using the provider named in the configuration
    ///
    /// Without a fixture the provider serves an empty tenant.
    pub fn from_config(config: Config) -> Result<Self> {
        let provider = match &config.provider.fixture {
            Some(path) => FixtureProvider::from_file(path)?,
            None => {
                tracing::warn!("No provider fixture configured, serving an empty tenant");
                FixtureProvider::new(FixtureDocument::new())
            }
        };
        Ok(Self::new(config, Arc::new(provider)))
    }
}
