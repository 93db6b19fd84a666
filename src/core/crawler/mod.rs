//! Crawling of provider content and mailboxes.
//!
//! [`CrawlScheduler`] walks the selected sites with bounded concurrency
//! and reports to a [`ProgressSink`] as work completes. It never
//! touches the index itself; the sink decides what to do with each
//! finished site.

mod retry;
mod scheduler;

pub use retry::{with_retry, RetryPolicy};
pub use scheduler::{mailbox_matches_site, CrawlOptions, CrawlScheduler};

use crate::core::types::{IndexRecord, Site, SiteFailure};

/// One site to crawl and which of its sources to visit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlPlan {
    pub site: Site,
    pub index_content: bool,
    pub index_mail: bool,
}

/// Progress after one unit of work (a folder or a mailbox)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitProgress {
    pub site_id: String,

    /// Folder path or mailbox owner the unit covered
    pub label: String,
    pub files: usize,

    /// 1 when the unit was a non-root folder
    pub folders: usize,

    /// Units finished so far for this site and source
    pub done_units: usize,

    /// Units queued or in flight for this site and source
    pub pending_units: usize,
}

impl UnitProgress {
    /// Fraction of the source's currently known units that are done
    pub fn fraction(&self) -> f64 {
        let known = self.done_units + self.pending_units;
        if known == 0 {
            return 1.0;
        }
        self.done_units as f64 / known as f64
    }
}

/// Records gathered from one source of one site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceCrawl {
    /// Sorted by id
    pub records: Vec<IndexRecord>,

    /// Every unit was visited without error or cancellation
    pub complete: bool,

    /// Non-root folders walked (content only)
    pub folders: usize,
}

/// Everything produced by crawling one site
#[derive(Debug, Clone, PartialEq)]
pub struct SiteCrawl {
    pub site: Site,
    pub content: Option<SourceCrawl>,
    pub mail: Option<SourceCrawl>,
    pub failures: Vec<SiteFailure>,
}

/// Summary of a whole crawl
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlResult {
    pub failures: Vec<SiteFailure>,
    pub cancelled: bool,
    pub sites_crawled: usize,
}

/// Receives crawl events as they happen.
///
/// Called from worker tasks, so implementations must be cheap and
/// must not block.
pub trait ProgressSink: Send + Sync {
    fn site_started(&self, site: &Site);

    fn unit_completed(&self, progress: UnitProgress);

    fn site_completed(&self, crawl: SiteCrawl);
}
