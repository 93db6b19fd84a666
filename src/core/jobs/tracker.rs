//! Progress state for one indexing job.
//!
//! The snapshot lives in a `watch` channel: writers update it in place
//! with `send_if_modified`, readers clone the latest value without
//! waiting on the crawl. Once the job reaches a terminal status every
//! further update is ignored.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use tokio::sync::watch;

use crate::core::crawler::UnitProgress;
use crate::core::types::{JobSnapshot, JobStatus, Site, SiteFailure};

/// Highest progress a job reports before it completes
const MAX_RUNNING_PROGRESS: f64 = 0.99;

pub struct JobTracker {
    tx: watch::Sender<JobSnapshot>,

    /// Completion fraction of sites currently being crawled
    in_flight: Mutex<HashMap<String, f64>>,
}

impl JobTracker {
    pub fn new(job_id: String, sites_total: usize) -> Self {
        let (tx, _rx) = watch::channel(JobSnapshot::new(job_id, sites_total));
        Self {
            tx,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Copy of the latest snapshot
    pub fn snapshot(&self) -> JobSnapshot {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.tx.subscribe()
    }

    pub fn job_id(&self) -> String {
        self.tx.borrow().job_id.clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.tx.borrow().status.is_terminal()
    }

    pub fn set_running(&self) {
        self.update(|s| s.status = JobStatus::Running);
    }

    pub fn request_cancel(&self) {
        self.update(|s| s.cancel_requested = true);
    }

    pub fn site_started(&self, site: &Site) {
        self.set_fraction(&site.id, 0.0);
        self.update(|s| {
            s.current_site = Some(site.name.clone());
            s.current_folder = None;
        });
    }

    pub fn unit_completed(&self, unit: &UnitProgress) {
        let in_flight = self.set_fraction(&unit.site_id, unit.fraction());
        self.update(|s| {
            s.files_processed += unit.files;
            s.folders_processed += unit.folders;
            s.current_folder = Some(unit.label.clone());
            s.progress = running_progress(s, in_flight);
        });
    }

    pub fn site_completed(&self, site_id: &str, failures: Vec<SiteFailure>) {
        let in_flight = self.clear_fraction(site_id);
        self.update(|s| {
            s.sites_processed += 1;
            s.site_errors.extend(failures);
            s.progress = running_progress(s, in_flight);
        });
    }

    /// Record selected sites that could not be crawled at all
    pub fn sites_skipped(&self, failures: Vec<SiteFailure>) {
        if failures.is_empty() {
            return;
        }
        let in_flight = self.in_flight_total();
        self.update(|s| {
            s.sites_processed += failures.len();
            s.site_errors.extend(failures);
            s.progress = running_progress(s, in_flight);
        });
    }

    /// Move to `completed` or `cancelled`
    pub fn finish(&self, status: JobStatus) {
        self.update(|s| {
            s.status = status;
            s.completed_at = Some(Utc::now());
            s.current_site = None;
            s.current_folder = None;
            if status == JobStatus::Completed {
                s.progress = 1.0;
            }
            s.error_message = summarize_failures(&s.site_errors);
        });
    }

    /// Move to `failed`
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|s| {
            s.status = JobStatus::Failed;
            s.completed_at = Some(Utc::now());
            s.current_site = None;
            s.current_folder = None;
            s.error_message = Some(message);
        });
    }

    fn update<F: FnOnce(&mut JobSnapshot)>(&self, f: F) {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.status.is_terminal() {
                return false;
            }
            f(snapshot);
            true
        });
    }

    fn set_fraction(&self, site_id: &str, fraction: f64) -> f64 {
        match self.in_flight.lock() {
            Ok(mut sites) => {
                sites.insert(site_id.to_string(), fraction);
                sites.values().sum()
            }
            Err(e) => {
                tracing::error!("Progress lock poisoned: {e}");
                0.0
            }
        }
    }

    fn clear_fraction(&self, site_id: &str) -> f64 {
        match self.in_flight.lock() {
            Ok(mut sites) => {
                sites.remove(site_id);
                sites.values().sum()
            }
            Err(e) => {
                tracing::error!("Progress lock poisoned: {e}");
                0.0
            }
        }
    }

    fn in_flight_total(&self) -> f64 {
        self.in_flight
            .lock()
            .map(|sites| sites.values().sum())
            .unwrap_or(0.0)
    }
}

/// Sites done plus partial credit for sites in flight, never moving
/// backwards and never reaching 1.0 before completion
fn running_progress(snapshot: &JobSnapshot, in_flight: f64) -> f64 {
    if snapshot.sites_total == 0 {
        return snapshot.progress;
    }
    let raw = (snapshot.sites_processed as f64 + in_flight) / snapshot.sites_total as f64;
    raw.min(MAX_RUNNING_PROGRESS).max(snapshot.progress)
}

fn summarize_failures(failures: &[SiteFailure]) -> Option<String> {
    if failures.is_empty() {
        return None;
    }

    let details: Vec<String> = failures
        .iter()
        .map(|f| {
            let name = if f.site_name.is_empty() {
                &f.site_id
            } else {
                &f.site_name
            };
            format!("{}: {}", name, f.message)
        })
        .collect();

    Some(format!(
        "{} error(s) while indexing: {}",
        failures.len(),
        details.join("; ")
    ))
}
