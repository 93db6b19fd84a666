//! Substring search and filtered listing over the index.

use std::sync::Arc;

use crate::core::error::Result;
use crate::core::search::query::prepare_query;
use crate::core::storage::{IndexStore, StoredRecord};
use crate::core::types::RecordPage;

/// Read-side queries over the [`IndexStore`]
pub struct SearchService {
    store: Arc<IndexStore>,
    default_limit: usize,
    max_query_length: usize,
}

impl SearchService {
    /// Create a new search service
    pub fn new(store: Arc<IndexStore>, default_limit: usize, max_query_length: usize) -> Self {
        Self {
            store,
            default_limit,
            max_query_length,
        }
    }

    /// Case-insensitive substring match over name, owner and type.
    ///
    /// Results keep the store's page order; `total` counts every match.
    pub fn search(&self, query: &str, offset: usize, limit: Option<usize>) -> Result<RecordPage> {
        let needle = prepare_query(query, self.max_query_length)?;
        let limit = limit.unwrap_or(self.default_limit);

        let page = self
            .store
            .filter_page(offset, limit, |record| matches(record, &needle));

        tracing::debug!(
            "Search '{}' matched {} records (offset {}, returned {})",
            query.trim(),
            page.total,
            offset,
            page.items.len()
        );

        Ok(page)
    }

    /// Page through the index, optionally restricted to one site
    pub fn list_files(
        &self,
        offset: usize,
        limit: Option<usize>,
        site_id: Option<&str>,
    ) -> RecordPage {
        let limit = limit.unwrap_or(self.default_limit);
        match site_id {
            Some(site_id) => self.store.filter_page(offset, limit, |record| {
                record.record().parent_site_id == site_id
            }),
            None => self.store.get_page(offset, limit),
        }
    }
}

fn matches(record: &StoredRecord, needle: &str) -> bool {
    record.folded_name().contains(needle)
        || record.folded_owner().contains(needle)
        || record.folded_type().contains(needle)
}
