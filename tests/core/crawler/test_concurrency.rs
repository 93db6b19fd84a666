//! Concurrency bounds of the site pool and the per-site folder pool

use crate::common::{fast_config, run_job, select_content};
use async_trait::async_trait;
use siteindex::core::provider::{
    AttachmentEntry, DriveEntry, FixtureDocument, FixtureProvider, Listing, ProviderClient,
    ProviderResult, ROOT_FOLDER,
};
use siteindex::core::services::Services;
use siteindex::core::types::{JobStatus, MailboxUser, Site};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct InFlight {
    per_site: HashMap<String, usize>,
    total: usize,
    max_total: usize,
    max_per_site: usize,
    max_sites: usize,
}

/// Wraps a fixture and records how many folder listings overlap
struct CountingProvider {
    inner: FixtureProvider,
    in_flight: Mutex<InFlight>,
}

impl CountingProvider {
    fn new(document: FixtureDocument) -> Self {
        Self {
            inner: FixtureProvider::new(document),
            in_flight: Mutex::new(InFlight::default()),
        }
    }

    fn enter(&self, site_id: &str) {
        let mut state = self.in_flight.lock().unwrap();
        let count = state.per_site.entry(site_id.to_string()).or_insert(0);
        *count += 1;
        let site_count = *count;
        state.total += 1;
        state.max_total = state.max_total.max(state.total);
        state.max_per_site = state.max_per_site.max(site_count);
        let active = state.per_site.values().filter(|n| **n > 0).count();
        state.max_sites = state.max_sites.max(active);
    }

    fn leave(&self, site_id: &str) {
        let mut state = self.in_flight.lock().unwrap();
        if let Some(count) = state.per_site.get_mut(site_id) {
            *count -= 1;
        }
        state.total -= 1;
    }

    fn maxima(&self) -> (usize, usize, usize) {
        let state = self.in_flight.lock().unwrap();
        (state.max_sites, state.max_per_site, state.max_total)
    }
}

#[async_trait]
impl ProviderClient for CountingProvider {
    async fn list_sites(&self) -> ProviderResult<Vec<Site>> {
        self.inner.list_sites().await
    }

    async fn list_folder_page(
        &self,
        site_id: &str,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> ProviderResult<Listing<DriveEntry>> {
        self.enter(site_id);
        tokio::time::sleep(Duration::from_millis(15)).await;
        let listing = self.inner.list_folder_page(site_id, folder_id, page_token).await;
        self.leave(site_id);
        listing
    }

    async fn list_mailbox_users(&self) -> ProviderResult<Vec<MailboxUser>> {
        self.inner.list_mailbox_users().await
    }

    async fn list_attachments(
        &self,
        user_id: &str,
        page_token: Option<&str>,
    ) -> ProviderResult<Listing<AttachmentEntry>> {
        self.inner.list_attachments(user_id, page_token).await
    }
}

/// `sites` sites with `folders` sibling folders of one file each
fn folder_tenant(sites: usize, folders: usize) -> FixtureDocument {
    let mut doc = FixtureDocument::new();
    for s in 0..sites {
        let site_id = format!("C{s}");
        doc.add_site(&site_id, &format!("Site {s}"));
        for f in 0..folders {
            let folder = format!("{site_id}-folder-{f}");
            doc.add_folder(&site_id, ROOT_FOLDER, &folder, &format!("Folder {f}"))
                .add_file(
                    &site_id,
                    &folder,
                    &format!("{site_id}-file-{f}"),
                    &format!("doc-{f}.pdf"),
                    10,
                );
        }
    }
    doc
}

fn services(provider: Arc<CountingProvider>, concurrency: usize, folder_concurrency: usize) -> Services {
    let mut config = fast_config();
    config.crawl.concurrency = concurrency;
    config.crawl.folder_concurrency = folder_concurrency;
    Services::new(config, provider)
}

#[tokio::test]
async fn test_folder_pool_bounds_one_site() {
    let provider = Arc::new(CountingProvider::new(folder_tenant(1, 12)));
    let services = services(Arc::clone(&provider), 4, 3);

    let snapshot = run_job(&services, select_content(&["C0"])).await;
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.files_processed, 12);

    let (_, max_per_site, _) = provider.maxima();
    assert!(max_per_site <= 3, "{max_per_site} folder listings overlapped");
    assert!(max_per_site > 1, "folders were never listed in parallel");
}

#[tokio::test]
async fn test_site_pool_bounds_whole_crawl() {
    let provider = Arc::new(CountingProvider::new(folder_tenant(5, 6)));
    let services = services(Arc::clone(&provider), 2, 3);

    let ids = ["C0", "C1", "C2", "C3", "C4"];
    let snapshot = run_job(&services, select_content(&ids)).await;
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.sites_processed, 5);
    assert_eq!(snapshot.files_processed, 30);

    let (max_sites, max_per_site, max_total) = provider.maxima();
    assert!(max_sites <= 2, "{max_sites} sites crawled at once");
    assert!(max_per_site <= 3, "{max_per_site} folder listings overlapped in one site");
    assert!(max_total <= 2 * 3, "{max_total} folder listings overlapped overall");
    assert!(max_sites > 1, "sites were never crawled in parallel");
}
