//! Merge tests

use crate::common::{content_record, site, snapshot};
use siteindex::core::storage::{IndexStore, MergeBatch};
use siteindex::core::types::Source;

#[test]
fn test_merge_is_idempotent() {
    let store = IndexStore::new(100);
    let s1 = site("S1", "Finance");
    let records = vec![
        content_record("a", "a.pdf", "S1"),
        content_record("b", "b.docx", "S1"),
    ];

    let first = store.merge(snapshot(&s1, records.clone()));
    let stats_once = store.stats();
    let second = store.merge(snapshot(&s1, records));
    let stats_twice = store.stats();

    assert_eq!(first.added, 2);
    assert_eq!(second.added, 0);
    assert_eq!(second.unchanged, 2);
    assert_eq!(second.removed, 0);
    assert_eq!(stats_once.total_files, stats_twice.total_files);
    assert_eq!(stats_once.total_size, stats_twice.total_size);
    assert_eq!(stats_once.file_types, stats_twice.file_types);
}

#[test]
fn test_merge_removes_missing_and_updates_attributes() {
    let store = IndexStore::new(100);
    let s1 = site("S1", "Finance");
    store.merge(snapshot(
        &s1,
        vec![
            content_record("a", "a.pdf", "S1"),
            content_record("b", "b.pdf", "S1"),
            content_record("c", "c.pdf", "S1"),
        ],
    ));

    let mut renamed = content_record("c", "c-v2.xlsx", "S1");
    renamed.size_bytes = 77;
    let outcome = store.merge(snapshot(&s1, vec![content_record("a", "a.pdf", "S1"), renamed]));

    assert_eq!(outcome.removed, 1);
    assert_eq!(outcome.updated, 1);
    assert_eq!(store.len(), 2);
    assert!(store.get("b").is_none());

    let c = store.get("c").unwrap();
    assert_eq!(c.name, "c-v2.xlsx");
    assert_eq!(c.file_type, "XLSX");
    assert_eq!(c.size_bytes, 77);
}

#[test]
fn test_partial_batch_does_not_prune() {
    let store = IndexStore::new(100);
    let s1 = site("S1", "Finance");
    store.merge(snapshot(
        &s1,
        vec![
            content_record("a", "a.pdf", "S1"),
            content_record("b", "b.pdf", "S1"),
        ],
    ));

    let mut partial = snapshot(&s1, vec![content_record("a", "a.pdf", "S1")]);
    partial.full_snapshot = false;
    let outcome = store.merge(partial);

    assert_eq!(outcome.removed, 0);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_merge_does_not_touch_other_sites() {
    let store = IndexStore::new(100);
    let s1 = site("S1", "Finance");
    let s2 = site("S2", "Marketing");
    store.merge(snapshot(&s1, vec![content_record("a", "a.pdf", "S1")]));
    store.merge(snapshot(&s2, vec![content_record("x", "x.pdf", "S2")]));

    store.merge(snapshot(&s1, Vec::new()));

    assert!(store.get("a").is_none());
    assert!(store.get("x").is_some());
    assert_eq!(store.stats().total_sites, 2);
}

#[test]
fn test_merge_reparents_records_onto_batch_site() {
    let store = IndexStore::new(100);
    let s1 = site("S1", "Finance");
    store.merge(snapshot(&s1, vec![content_record("a", "a.pdf", "elsewhere")]));

    assert_eq!(store.get("a").unwrap().parent_site_id, "S1");
    assert_eq!(store.site_summary("S1").unwrap().total_files, 1);
}

#[test]
fn test_mail_batch_leaves_content_alone() {
    let store = IndexStore::new(100);
    let s1 = site("S1", "Finance");
    store.merge(snapshot(&s1, vec![content_record("a", "a.pdf", "S1")]));

    let mut attachment = content_record("S1:m1", "invoice.pdf", "S1");
    attachment.source = Source::Mail;
    store.merge(MergeBatch {
        site: s1.clone(),
        source: Source::Mail,
        records: vec![attachment],
        full_snapshot: true,
        folders: 0,
    });
    store.merge(MergeBatch {
        site: s1,
        source: Source::Mail,
        records: Vec::new(),
        full_snapshot: true,
        folders: 0,
    });

    assert!(store.get("a").is_some());
    assert!(store.get("S1:m1").is_none());
}

#[test]
fn test_site_summary_tracks_folders_and_size() {
    let store = IndexStore::new(100);
    let s1 = site("S1", "Finance");
    let mut batch = snapshot(
        &s1,
        vec![
            content_record("a", "a.pdf", "S1"),
            content_record("b", "b.pdf", "S1"),
        ],
    );
    batch.folders = 3;
    store.merge(batch);

    let summary = store.site_summary("S1").unwrap();
    assert_eq!(summary.site_name, "Finance");
    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.total_folders, 3);
    assert_eq!(summary.total_size, 20);

    let stats = store.stats();
    assert_eq!(stats.total_folders, 3);
    assert!(stats.last_indexed.is_some());
}

#[test]
fn test_clear_empties_store() {
    let store = IndexStore::new(100);
    store.merge(snapshot(&site("S1", "Finance"), vec![content_record("a", "a.pdf", "S1")]));

    store.clear();

    assert!(store.is_empty());
    let stats = store.stats();
    assert_eq!(stats.total_sites, 0);
    assert!(stats.last_indexed.is_none());
}
