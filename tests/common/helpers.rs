//! Test helper functions

use siteindex::core::config::Config;
use siteindex::core::provider::{FixtureDocument, FixtureProvider};
use siteindex::core::services::Services;
use siteindex::core::types::{JobSnapshot, SiteSelection};
use std::sync::Arc;
use std::time::Duration;

/// Configuration with millisecond retry delays
#[allow(dead_code)] // Used in integration tests
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.crawl.retry_base_delay_ms = 1;
    config.crawl.retry_max_delay_ms = 5;
    config
}

/// Services wired around `provider` with fast retries
#[allow(dead_code)] // Used in integration tests
pub fn create_test_services(provider: Arc<FixtureProvider>) -> Services {
    Services::new(fast_config(), provider)
}

/// Provider plus services over `document`
#[allow(dead_code)] // Used in integration tests
pub fn setup(document: FixtureDocument) -> (Arc<FixtureProvider>, Services) {
    let provider = Arc::new(FixtureProvider::new(document));
    let services = create_test_services(Arc::clone(&provider));
    (provider, services)
}

/// Selection of both sources for each id
#[allow(dead_code)] // Used in integration tests
pub fn select_all(ids: &[&str]) -> Vec<SiteSelection> {
    ids.iter()
        .map(|id| SiteSelection {
            site_id: id.to_string(),
            index_content: true,
            index_mail: true,
        })
        .collect()
}

/// Selection of content only for each id
#[allow(dead_code)] // Used in integration tests
pub fn select_content(ids: &[&str]) -> Vec<SiteSelection> {
    ids.iter().map(|id| SiteSelection::content_only(*id)).collect()
}

/// Follow the current job until it reaches a terminal state
#[allow(dead_code)] // Used in integration tests
pub async fn wait_for_terminal(services: &Services) -> JobSnapshot {
    let mut updates = services
        .jobs
        .subscribe()
        .expect("a job should have been started");

    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            if updates.changed().await.is_err() {
                return updates.borrow().clone();
            }
        }
    })
    .await
    .expect("job did not finish in time")
}

/// Start a job over `selection` and wait for it to finish
#[allow(dead_code)] // Used in integration tests
pub async fn run_job(services: &Services, selection: Vec<SiteSelection>) -> JobSnapshot {
    services
        .jobs
        .start_job(selection)
        .expect("job should start");
    wait_for_terminal(services).await
}

/// Poll until `condition` holds for the current job snapshot
#[allow(dead_code)] // Used in integration tests
pub async fn wait_until<F>(services: &Services, condition: F) -> JobSnapshot
where
    F: Fn(&JobSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let snapshot = services.jobs.get_status(None).expect("job should exist");
            if condition(&snapshot) || snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}
