//! Incremental re-indexing tests
//!
//! Tests that a later job refreshes changed records and drops deleted
//! ones without touching other sites or sources.

use crate::common::{run_job, select_all, select_content, setup, tenant};
use siteindex::core::provider::{DriveEntry, ROOT_FOLDER};
use siteindex::core::types::JobStatus;

#[tokio::test]
async fn test_deleted_file_is_removed_on_next_job() {
    let (provider, services) = setup(tenant());
    run_job(&services, select_content(&["S1"])).await;
    assert_eq!(services.store.len(), 5);

    provider.update(|doc| {
        doc.remove_entry("S1", "s1-reports", "s1-q2");
    });
    services.cache.invalidate_all();
    let snapshot = run_job(&services, select_content(&["S1"])).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(services.store.len(), 4);
    assert!(services.store.get("s1-q2").is_none());
    assert!(services.store.get("s1-q1").is_some());
}

#[tokio::test]
async fn test_changed_file_keeps_latest_attributes() {
    let (provider, services) = setup(tenant());
    run_job(&services, select_content(&["S1"])).await;

    provider.update(|doc| {
        doc.put_file(
            "S1",
            ROOT_FOLDER,
            DriveEntry::File {
                id: "s1-notes".to_string(),
                name: "notes-final.md".to_string(),
                url: String::new(),
                size: 999,
                created_by: Some("Ann".to_string()),
                created_at: None,
                modified_at: None,
                mime_type: Some("text/markdown".to_string()),
            },
        );
    });
    run_job(&services, select_content(&["S1"])).await;

    let notes = services.store.get("s1-notes").unwrap();
    assert_eq!(notes.name, "notes-final.md");
    assert_eq!(notes.file_type, "MD");
    assert_eq!(notes.size_bytes, 999);
    assert_eq!(notes.owner.as_deref(), Some("Ann"));
    assert_eq!(services.store.len(), 5);
}

#[tokio::test]
async fn test_reindex_is_idempotent() {
    let (_provider, services) = setup(tenant());
    run_job(&services, select_all(&["S1", "S2"])).await;
    let first = services.store.stats();

    run_job(&services, select_all(&["S1", "S2"])).await;
    let second = services.store.stats();

    assert_eq!(first.total_files, second.total_files);
    assert_eq!(first.total_folders, second.total_folders);
    assert_eq!(first.total_size, second.total_size);
    assert_eq!(first.file_types, second.file_types);
}

#[tokio::test]
async fn test_other_sites_survive_reindex() {
    let (provider, services) = setup(tenant());
    run_job(&services, select_content(&["S1", "S2"])).await;

    provider.update(|doc| {
        doc.remove_entry("S1", ROOT_FOLDER, "s1-notes");
    });
    run_job(&services, select_content(&["S1"])).await;

    assert!(services.store.get("s2-plan").is_some());
    assert!(services.store.get("s2-logo").is_some());
    assert!(services.store.get("s1-notes").is_none());
}

#[tokio::test]
async fn test_content_reindex_keeps_mail_records() {
    let (_provider, services) = setup(tenant());
    run_job(&services, select_all(&["S1"])).await;
    assert_eq!(services.store.len(), 7);

    run_job(&services, select_content(&["S1"])).await;
    assert_eq!(services.store.len(), 7);
    assert!(services.store.get("S1:a1").is_some());
}

#[tokio::test]
async fn test_partial_listing_does_not_prune() {
    let (provider, services) = setup(tenant());
    run_job(&services, select_content(&["S1"])).await;

    provider.deny("folder:S1:s1-reports:1", "access denied");
    let snapshot = run_job(&services, select_content(&["S1"])).await;

    assert_eq!(snapshot.site_errors.len(), 1);
    assert!(services.store.get("s1-q1").is_some());
    assert!(services.store.get("s1-q2").is_some());
    assert_eq!(services.store.len(), 5);
}
