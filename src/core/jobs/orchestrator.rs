//! Single-flight ownership of the indexing job.
//!
//! [`JobOrchestrator`] holds the one job slot. Starting a job checks
//! and fills the slot under one lock, so two concurrent starts can
//! never both succeed. The crawl runs on a spawned task and reports
//! through a [`JobTracker`]; finished sites are merged into the
//! [`IndexStore`] as they complete.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::cache::DiscoveryCache;
use crate::core::crawler::{CrawlPlan, CrawlScheduler, ProgressSink, SiteCrawl, UnitProgress};
use crate::core::error::{Result, SiteIndexError};
use crate::core::jobs::JobTracker;
use crate::core::provider::ProviderError;
use crate::core::storage::{IndexStore, MergeBatch};
use crate::core::types::{JobSnapshot, JobStatus, Site, SiteFailure, SiteSelection, Source};

#[derive(Default)]
struct Slot {
    tracker: Option<Arc<JobTracker>>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,

    /// Set while `clear_all` is draining the old task and purging state
    resetting: bool,
}

/// Owns the current (or most recent) indexing job
pub struct JobOrchestrator {
    slot: Mutex<Slot>,
    reset: tokio::sync::Mutex<()>,
    scheduler: CrawlScheduler,
    store: Arc<IndexStore>,
    cache: Arc<DiscoveryCache>,
}

impl JobOrchestrator {
    pub fn new(
        scheduler: CrawlScheduler,
        store: Arc<IndexStore>,
        cache: Arc<DiscoveryCache>,
    ) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            reset: tokio::sync::Mutex::new(()),
            scheduler,
            store,
            cache,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Start indexing `selection` and return the new job's first snapshot.
    ///
    /// Fails with `AlreadyRunning` while a job is active or a reset is
    /// in progress. Must be called from within a Tokio runtime.
    pub fn start_job(&self, selection: Vec<SiteSelection>) -> Result<JobSnapshot> {
        validate_selection(&selection)?;

        let mut slot = self.slot();
        if slot.resetting {
            return Err(SiteIndexError::AlreadyRunning(
                "index reset in progress".to_string(),
            ));
        }
        if let Some(current) = &slot.tracker {
            if !current.is_terminal() {
                return Err(SiteIndexError::AlreadyRunning(current.job_id()));
            }
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        let tracker = Arc::new(JobTracker::new(job_id.clone(), selection.len()));
        let cancel = CancellationToken::new();

        tracing::info!(
            "Starting job {} for {} site(s)",
            job_id,
            selection.len()
        );

        tracker.set_running();
        let snapshot = tracker.snapshot();
        let handle = tokio::spawn(run_job(
            self.scheduler.clone(),
            Arc::clone(&self.store),
            Arc::clone(&tracker),
            selection,
            cancel.clone(),
        ));

        slot.tracker = Some(tracker);
        slot.cancel = cancel;
        slot.handle = Some(handle);

        Ok(snapshot)
    }

    /// Latest snapshot, optionally requiring a specific job id
    pub fn get_status(&self, job_id: Option<&str>) -> Result<JobSnapshot> {
        let tracker = self
            .slot()
            .tracker
            .clone()
            .ok_or_else(|| SiteIndexError::JobNotFound("no indexing job has run".to_string()))?;

        let snapshot = tracker.snapshot();
        match job_id {
            Some(id) if id != snapshot.job_id => Err(SiteIndexError::JobNotFound(id.to_string())),
            _ => Ok(snapshot),
        }
    }

    /// Follow the current job's snapshots as they change
    pub fn subscribe(&self) -> Option<watch::Receiver<JobSnapshot>> {
        self.slot().tracker.as_ref().map(|t| t.subscribe())
    }

    /// Ask the running job to stop. Returns whether a running job was
    /// signalled; cancelling with nothing running is a no-op.
    pub fn cancel(&self) -> bool {
        let slot = self.slot();
        match &slot.tracker {
            Some(tracker) if !tracker.is_terminal() => {
                if !slot.cancel.is_cancelled() {
                    tracing::info!("Cancelling job {}", tracker.job_id());
                }
                tracker.request_cancel();
                slot.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancel any running job, wait for it to stop, then drop the job
    /// record, the index and the discovery cache.
    ///
    /// No job can start until the reset has finished.
    pub async fn clear_all(&self) {
        let _reset = self.reset.lock().await;
        let _resetting = ResettingGuard::enter(self);

        let handle = {
            let mut slot = self.slot();
            slot.cancel.cancel();
            if let Some(tracker) = &slot.tracker {
                tracker.request_cancel();
            }
            slot.handle.take()
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Indexing task ended abnormally: {}", e);
            }
        }

        self.store.clear();
        self.cache.invalidate_all();

        self.slot().tracker = None;
        tracing::info!("Cleared job state, index and discovery cache");
    }

    /// Sites available for selection, served from the discovery cache
    pub async fn discover_sites(&self) -> Result<Vec<Site>> {
        self.scheduler
            .discover_sites(&CancellationToken::new())
            .await
            .map(|sites| sites.as_ref().clone())
            .map_err(|e| SiteIndexError::DiscoveryFailed(e.to_string()))
    }
}

/// Holds the slot in its resetting state until dropped, so a
/// cancelled `clear_all` still reopens the slot
struct ResettingGuard<'a> {
    orchestrator: &'a JobOrchestrator,
}

impl<'a> ResettingGuard<'a> {
    fn enter(orchestrator: &'a JobOrchestrator) -> Self {
        orchestrator.slot().resetting = true;
        Self { orchestrator }
    }
}

impl Drop for ResettingGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.slot().resetting = false;
    }
}

fn validate_selection(selection: &[SiteSelection]) -> Result<()> {
    if selection.is_empty() {
        return Err(SiteIndexError::InvalidSelection(
            "at least one site must be selected".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for entry in selection {
        if entry.site_id.trim().is_empty() {
            return Err(SiteIndexError::InvalidSelection(
                "site_id must not be empty".to_string(),
            ));
        }
        if !entry.index_content && !entry.index_mail {
            return Err(SiteIndexError::InvalidSelection(format!(
                "site {} selects neither content nor mail",
                entry.site_id
            )));
        }
        if !seen.insert(entry.site_id.as_str()) {
            return Err(SiteIndexError::InvalidSelection(format!(
                "site {} is selected more than once",
                entry.site_id
            )));
        }
    }

    Ok(())
}

async fn run_job(
    scheduler: CrawlScheduler,
    store: Arc<IndexStore>,
    tracker: Arc<JobTracker>,
    selection: Vec<SiteSelection>,
    cancel: CancellationToken,
) {
    let job_id = tracker.job_id();

    let sites = match scheduler.discover_sites(&cancel).await {
        Ok(sites) => sites,
        Err(ProviderError::Cancelled) => {
            tracing::info!("Job {} cancelled during discovery", job_id);
            tracker.finish(JobStatus::Cancelled);
            return;
        }
        Err(e) => {
            let err = SiteIndexError::DiscoveryFailed(e.to_string());
            tracing::error!("Job {} failed: {}", job_id, err);
            tracker.fail(err.to_string());
            return;
        }
    };

    let mut plans = Vec::with_capacity(selection.len());
    let mut missing = Vec::new();
    for entry in selection {
        match sites.iter().find(|s| s.id == entry.site_id) {
            Some(site) => plans.push(CrawlPlan {
                site: site.clone(),
                index_content: entry.index_content,
                index_mail: entry.index_mail,
            }),
            None => {
                tracing::warn!("Selected site {} was not discovered", entry.site_id);
                missing.push(SiteFailure {
                    site_id: entry.site_id,
                    site_name: String::new(),
                    message: "site not found".to_string(),
                });
            }
        }
    }
    tracker.sites_skipped(missing);

    let sink = Arc::new(IndexingSink {
        store,
        tracker: Arc::clone(&tracker),
    });
    let result = scheduler.crawl(plans, sink, cancel).await;

    if result.cancelled {
        tracker.finish(JobStatus::Cancelled);
    } else {
        tracker.finish(JobStatus::Completed);
    }

    let snapshot = tracker.snapshot();
    tracing::info!(
        "Job {} {}: {} sites, {} files, {} folders, {} site errors",
        job_id,
        snapshot.status.as_str(),
        snapshot.sites_processed,
        snapshot.files_processed,
        snapshot.folders_processed,
        snapshot.site_errors.len()
    );
}

/// Merges each finished site into the store and feeds the tracker
struct IndexingSink {
    store: Arc<IndexStore>,
    tracker: Arc<JobTracker>,
}

impl ProgressSink for IndexingSink {
    fn site_started(&self, site: &Site) {
        self.tracker.site_started(site);
    }

    fn unit_completed(&self, progress: UnitProgress) {
        self.tracker.unit_completed(&progress);
    }

    fn site_completed(&self, crawl: SiteCrawl) {
        let SiteCrawl {
            site,
            content,
            mail,
            failures,
        } = crawl;

        let sources = [(Source::Content, content), (Source::Mail, mail)];
        for (source, crawled) in sources {
            let Some(crawled) = crawled else {
                continue;
            };
            let outcome = self.store.merge(MergeBatch {
                site: site.clone(),
                source,
                records: crawled.records,
                full_snapshot: crawled.complete,
                folders: crawled.folders,
            });
            tracing::debug!(
                "Site {} {}: {} added, {} updated, {} removed",
                site.id,
                source.as_str(),
                outcome.added,
                outcome.updated,
                outcome.removed
            );
        }

        self.tracker.site_completed(&site.id, failures);
    }
}
