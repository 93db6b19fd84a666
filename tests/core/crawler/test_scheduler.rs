//! Scheduler tests against a recording sink

use crate::common::{fast_config, many_folders_site, tenant};
use siteindex::core::cache::DiscoveryCache;
use siteindex::core::crawler::{
    mailbox_matches_site, CrawlPlan, CrawlScheduler, ProgressSink, SiteCrawl, UnitProgress,
};
use siteindex::core::provider::FixtureProvider;
use siteindex::core::types::{MailboxUser, Site};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingSink {
    started: Mutex<Vec<String>>,
    units: Mutex<Vec<UnitProgress>>,
    completed: Mutex<Vec<SiteCrawl>>,
}

impl ProgressSink for RecordingSink {
    fn site_started(&self, site: &Site) {
        self.started.lock().unwrap().push(site.id.clone());
    }

    fn unit_completed(&self, progress: UnitProgress) {
        self.units.lock().unwrap().push(progress);
    }

    fn site_completed(&self, crawl: SiteCrawl) {
        self.completed.lock().unwrap().push(crawl);
    }
}

fn scheduler(provider: Arc<FixtureProvider>) -> CrawlScheduler {
    CrawlScheduler::new(
        provider,
        Arc::new(DiscoveryCache::new(Duration::from_secs(60))),
        fast_config().crawl.options(),
    )
}

async fn plans_for(scheduler: &CrawlScheduler, ids: &[&str], mail: bool) -> Vec<CrawlPlan> {
    let sites = scheduler
        .discover_sites(&CancellationToken::new())
        .await
        .unwrap();
    ids.iter()
        .map(|id| CrawlPlan {
            site: sites.iter().find(|s| s.id == *id).unwrap().clone(),
            index_content: true,
            index_mail: mail,
        })
        .collect()
}

#[tokio::test]
async fn test_every_site_is_reported() {
    let provider = Arc::new(FixtureProvider::new(tenant()));
    let scheduler = scheduler(provider);
    let plans = plans_for(&scheduler, &["S1", "S2", "S3"], true).await;
    let sink = Arc::new(RecordingSink::default());

    let result = scheduler
        .crawl(plans, Arc::clone(&sink) as Arc<dyn ProgressSink>, CancellationToken::new())
        .await;

    assert!(!result.cancelled);
    assert!(result.failures.is_empty());
    assert_eq!(result.sites_crawled, 3);

    let completed = sink.completed.lock().unwrap();
    assert_eq!(completed.len(), 3);
    assert!(completed
        .iter()
        .all(|c| c.content.as_ref().is_some_and(|s| s.complete)));

    let s1 = completed.iter().find(|c| c.site.id == "S1").unwrap();
    assert_eq!(s1.content.as_ref().unwrap().records.len(), 5);
    assert_eq!(s1.content.as_ref().unwrap().folders, 2);
    assert_eq!(s1.mail.as_ref().unwrap().records.len(), 2);
    assert_eq!(sink.started.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unit_progress_counts_folders() {
    let provider = Arc::new(FixtureProvider::new(many_folders_site(6)));
    let scheduler = scheduler(provider);
    let plans = plans_for(&scheduler, &["M"], false).await;
    let sink = Arc::new(RecordingSink::default());

    scheduler
        .crawl(plans, Arc::clone(&sink) as Arc<dyn ProgressSink>, CancellationToken::new())
        .await;

    let units = sink.units.lock().unwrap();
    assert_eq!(units.len(), 7);
    assert_eq!(units.iter().map(|u| u.folders).sum::<usize>(), 6);
    assert_eq!(units.iter().map(|u| u.files).sum::<usize>(), 6);
    assert!(units.iter().all(|u| (0.0..=1.0).contains(&u.fraction())));
    assert_eq!(units.last().unwrap().pending_units, 0);
}

#[tokio::test]
async fn test_cancelled_before_start_dispatches_nothing() {
    let provider = Arc::new(FixtureProvider::new(tenant()));
    let scheduler = scheduler(Arc::clone(&provider));
    let plans = plans_for(&scheduler, &["S1", "S2"], false).await;
    let sink = Arc::new(RecordingSink::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = scheduler
        .crawl(plans, Arc::clone(&sink) as Arc<dyn ProgressSink>, cancel)
        .await;

    assert!(result.cancelled);
    assert_eq!(result.sites_crawled, 0);
    assert!(sink.completed.lock().unwrap().is_empty());
    assert_eq!(provider.call_count("list_folder_page"), 0);
}

#[tokio::test]
async fn test_discovery_is_cached() {
    let provider = Arc::new(FixtureProvider::new(tenant()));
    let scheduler = scheduler(Arc::clone(&provider));
    let cancel = CancellationToken::new();

    let first = scheduler.discover_sites(&cancel).await.unwrap();
    let second = scheduler.discover_sites(&cancel).await.unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(provider.call_count("list_sites"), 1);
}

#[test]
fn test_mailbox_matching_rules() {
    let site = Site {
        id: "S".to_string(),
        name: "Human Resources".to_string(),
        url: String::new(),
    };
    let user = |display: &str, mail: &str| MailboxUser {
        id: "u".to_string(),
        display_name: display.to_string(),
        mail: mail.to_string(),
    };

    assert!(mailbox_matches_site(&user("HUMAN RESOURCES Team", ""), &site));
    assert!(mailbox_matches_site(&user("HR", "human.resources@example.com"), &site));
    assert!(!mailbox_matches_site(&user("HR", "hr@example.com"), &site));

    let unnamed = Site {
        name: "  ".to_string(),
        ..site
    };
    assert!(!mailbox_matches_site(&user("anyone", "anyone@example.com"), &unnamed));
}
