//! Incremental record store with stable ordering.
//!
//! Records are keyed by provider id and kept in a secondary ordered
//! set on `(source, folded name, id)`, which gives pagination a
//! deterministic order independent of merge order.
//!
//! A merge runs entirely under the write lock, so merges for one site
//! never interleave and readers never see half of a batch.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::core::text::fold;
use crate::core::types::{IndexRecord, IndexStats, RecordPage, Site, SiteSummary, Source};

/// One site's records from one source, produced by a crawl
#[derive(Debug, Clone)]
pub struct MergeBatch {
    pub site: Site,
    pub source: Source,
    pub records: Vec<IndexRecord>,

    /// The batch lists every live entity for `(site, source)`; anything
    /// stored for that pair and absent here is deleted
    pub full_snapshot: bool,

    /// Folders walked to produce a content batch
    pub folders: usize,
}

/// What a merge changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    source: Source,
    name: String,
    id: String,
}

/// A stored record together with its folded search fields
#[derive(Debug, Clone)]
pub struct StoredRecord {
    record: IndexRecord,
    folded_name: String,
    folded_owner: String,
    folded_type: String,
}

impl StoredRecord {
    fn new(record: IndexRecord) -> Self {
        Self {
            folded_name: fold(&record.name),
            folded_owner: record.owner.as_deref().map(fold).unwrap_or_default(),
            folded_type: fold(&record.file_type),
            record,
        }
    }

    fn sort_key(&self) -> SortKey {
        SortKey {
            source: self.record.source,
            name: self.folded_name.clone(),
            id: self.record.id.clone(),
        }
    }

    pub fn record(&self) -> &IndexRecord {
        &self.record
    }

    pub fn folded_name(&self) -> &str {
        &self.folded_name
    }

    pub fn folded_owner(&self) -> &str {
        &self.folded_owner
    }

    pub fn folded_type(&self) -> &str {
        &self.folded_type
    }
}

#[derive(Debug, Clone)]
struct SiteEntry {
    site: Site,
    folders: usize,
    last_indexed: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, StoredRecord>,
    order: BTreeSet<SortKey>,
    sites: HashMap<String, SiteEntry>,
    last_indexed: Option<DateTime<Utc>>,
}

enum Upsert {
    Added,
    Updated,
    Unchanged,
}

impl Inner {
    fn upsert(&mut self, record: IndexRecord) -> Upsert {
        if let Some(existing) = self.records.get(&record.id) {
            if existing.record == record {
                return Upsert::Unchanged;
            }
            let old_key = existing.sort_key();
            self.order.remove(&old_key);
            let stored = StoredRecord::new(record);
            self.order.insert(stored.sort_key());
            self.records.insert(stored.record.id.clone(), stored);
            Upsert::Updated
        } else {
            let stored = StoredRecord::new(record);
            self.order.insert(stored.sort_key());
            self.records.insert(stored.record.id.clone(), stored);
            Upsert::Added
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        match self.records.remove(id) {
            Some(stored) => {
                self.order.remove(&stored.sort_key());
                true
            }
            None => false,
        }
    }

    fn summarize(&self, entry: &SiteEntry) -> SiteSummary {
        let (files, size) = self
            .records
            .values()
            .filter(|r| r.record.parent_site_id == entry.site.id)
            .fold((0usize, 0u64), |(n, bytes), r| {
                (n + 1, bytes + r.record.size_bytes)
            });

        SiteSummary {
            site_id: entry.site.id.clone(),
            site_name: entry.site.name.clone(),
            site_url: entry.site.url.clone(),
            total_files: files,
            total_folders: entry.folders,
            total_size: size,
            last_indexed: entry.last_indexed,
        }
    }
}

/// Authoritative in-memory index of crawled records
pub struct IndexStore {
    inner: RwLock<Inner>,
    max_page_size: usize,
}

impl IndexStore {
    /// Create an empty store; page requests are clamped to `max_page_size`
    pub fn new(max_page_size: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_page_size: max_page_size.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Upsert a batch by record id.
    ///
    /// Records are re-parented onto `batch.site`. Records whose source
    /// differs from `batch.source` are skipped. With `full_snapshot`,
    /// stored records for the same site and source that are missing
    /// from the batch are removed.
    pub fn merge(&self, batch: MergeBatch) -> MergeOutcome {
        let MergeBatch {
            site,
            source,
            records,
            full_snapshot,
            folders,
        } = batch;

        let site_id = site.id.clone();
        let now = Utc::now();
        let mut outcome = MergeOutcome::default();
        let mut seen = HashSet::with_capacity(records.len());
        let mut inner = self.write();

        for mut record in records {
            if record.source != source {
                tracing::warn!(
                    "Skipping record {} with source {} in a {} batch for site {}",
                    record.id,
                    record.source.as_str(),
                    source.as_str(),
                    site_id
                );
                continue;
            }
            record.parent_site_id = site_id.clone();
            seen.insert(record.id.clone());

            match inner.upsert(record) {
                Upsert::Added => outcome.added += 1,
                Upsert::Updated => outcome.updated += 1,
                Upsert::Unchanged => outcome.unchanged += 1,
            }
        }

        if full_snapshot {
            let stale: Vec<String> = inner
                .records
                .values()
                .filter(|r| {
                    r.record.parent_site_id == site_id
                        && r.record.source == source
                        && !seen.contains(&r.record.id)
                })
                .map(|r| r.record.id.clone())
                .collect();

            for id in stale {
                if inner.remove(&id) {
                    outcome.removed += 1;
                }
            }
        }

        let entry = inner.sites.entry(site_id.clone()).or_insert(SiteEntry {
            site: site.clone(),
            folders: 0,
            last_indexed: now,
        });
        entry.site = site;
        entry.last_indexed = now;
        if source == Source::Content {
            entry.folders = if full_snapshot {
                folders
            } else {
                entry.folders.max(folders)
            };
        }
        inner.last_indexed = Some(now);

        tracing::debug!(
            "Merged {} batch for site {}: +{} ~{} ={} -{}",
            source.as_str(),
            site_id,
            outcome.added,
            outcome.updated,
            outcome.unchanged,
            outcome.removed
        );

        outcome
    }

    /// Page through all records in stable order
    pub fn get_page(&self, offset: usize, limit: usize) -> RecordPage {
        self.filter_page(offset, limit, |_| true)
    }

    /// Page through the records accepted by `keep`, in the same order as
    /// [`get_page`](Self::get_page). `total` counts every match.
    pub fn filter_page<F>(&self, offset: usize, limit: usize, keep: F) -> RecordPage
    where
        F: Fn(&StoredRecord) -> bool,
    {
        let limit = self.clamp_limit(limit);
        let inner = self.read();

        let mut total = 0;
        let mut items = Vec::new();
        for key in &inner.order {
            let Some(stored) = inner.records.get(&key.id) else {
                continue;
            };
            if !keep(stored) {
                continue;
            }
            if total >= offset && items.len() < limit {
                items.push(stored.record.clone());
            }
            total += 1;
        }

        RecordPage {
            items,
            total,
            offset,
            limit,
        }
    }

    /// Recompute aggregate statistics from the current record set
    pub fn stats(&self) -> IndexStats {
        let inner = self.read();

        let mut stats = IndexStats {
            total_sites: inner.sites.len(),
            total_files: inner.records.len(),
            last_indexed: inner.last_indexed,
            ..IndexStats::default()
        };

        for stored in inner.records.values() {
            stats.total_size += stored.record.size_bytes;
            *stats
                .file_types
                .entry(stored.record.file_type.clone())
                .or_insert(0) += 1;
        }

        let mut sites: Vec<SiteSummary> =
            inner.sites.values().map(|e| inner.summarize(e)).collect();
        sites.sort_by(|a, b| {
            fold(&a.site_name)
                .cmp(&fold(&b.site_name))
                .then_with(|| a.site_id.cmp(&b.site_id))
        });
        stats.total_folders = sites.iter().map(|s| s.total_folders).sum();
        stats.sites = sites;

        stats
    }

    /// Summary for one site, if it has been merged at least once
    pub fn site_summary(&self, site_id: &str) -> Option<SiteSummary> {
        let inner = self.read();
        inner.sites.get(site_id).map(|e| inner.summarize(e))
    }

    /// Look up a record by id
    pub fn get(&self, id: &str) -> Option<IndexRecord> {
        self.read().records.get(id).map(|s| s.record.clone())
    }

    /// Drop every record and site
    pub fn clear(&self) {
        let mut inner = self.write();
        let dropped = inner.records.len();
        *inner = Inner::default();
        tracing::info!("Cleared index ({} records dropped)", dropped);
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    fn clamp_limit(&self, limit: usize) -> usize {
        limit.clamp(1, self.max_page_size)
    }
}
