//! Pagination tests

use crate::common::{content_record, site, snapshot};
use siteindex::core::storage::IndexStore;
use std::collections::HashSet;

fn populated(count: usize) -> IndexStore {
    let store = IndexStore::new(50);
    let records = (0..count)
        .map(|i| content_record(&format!("id-{i:03}"), &format!("File {i:03}.txt"), "S1"))
        .collect();
    store.merge(snapshot(&site("S1", "Finance"), records));
    store
}

#[test]
fn test_pages_are_disjoint_and_cover_everything() {
    let store = populated(23);

    let mut seen = HashSet::new();
    let mut offset = 0;
    loop {
        let page = store.get_page(offset, 5);
        assert_eq!(page.total, 23);
        if page.items.is_empty() {
            break;
        }
        for record in &page.items {
            assert!(seen.insert(record.id.clone()), "duplicate {}", record.id);
        }
        offset += page.items.len();
    }

    assert_eq!(seen.len(), 23);
}

#[test]
fn test_order_is_stable_between_calls() {
    let store = populated(10);

    let first: Vec<_> = store.get_page(0, 10).items.into_iter().map(|r| r.id).collect();
    let second: Vec<_> = store.get_page(0, 10).items.into_iter().map(|r| r.id).collect();

    assert_eq!(first, second);
    assert_eq!(first[0], "id-000");
}

#[test]
fn test_order_ignores_name_case() {
    let store = IndexStore::new(50);
    store.merge(snapshot(
        &site("S1", "Finance"),
        vec![
            content_record("1", "beta.txt", "S1"),
            content_record("2", "Alpha.txt", "S1"),
            content_record("3", "gamma.txt", "S1"),
        ],
    ));

    let names: Vec<_> = store.get_page(0, 10).items.into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["Alpha.txt", "beta.txt", "gamma.txt"]);
}

#[test]
fn test_offset_past_end_is_empty() {
    let store = populated(3);

    let page = store.get_page(10, 5);
    assert!(page.items.is_empty());
    assert_eq!(page.total, 3);
    assert_eq!(page.offset, 10);
}

#[test]
fn test_limit_is_clamped() {
    let store = populated(60);

    let page = store.get_page(0, 1000);
    assert_eq!(page.limit, 50);
    assert_eq!(page.items.len(), 50);

    let page = store.get_page(0, 0);
    assert_eq!(page.limit, 1);
    assert_eq!(page.items.len(), 1);
}
