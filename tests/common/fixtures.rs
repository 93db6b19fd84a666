//! Provider fixtures for integration tests

use siteindex::core::provider::{FixtureDocument, ROOT_FOLDER};
use siteindex::core::storage::MergeBatch;
use siteindex::core::types::{file_type_from_name, IndexRecord, Site, Source};

/// Site S1 "Finance": two folders and five files.
///
/// ```text
/// root/
///   budget.xlsx
///   notes.txt
///   Reports/
///     q1.pdf
///     q2.pdf
///   Archive/
///     old.docx
/// ```
#[allow(dead_code)] // Used in integration tests
pub fn finance_site() -> FixtureDocument {
    let mut doc = FixtureDocument::new();
    add_finance(&mut doc);
    doc
}

#[allow(dead_code)] // Used in integration tests
pub fn add_finance(doc: &mut FixtureDocument) {
    doc.add_site("S1", "Finance")
        .add_file("S1", ROOT_FOLDER, "s1-budget", "budget.xlsx", 2048)
        .add_file("S1", ROOT_FOLDER, "s1-notes", "notes.txt", 100)
        .add_folder("S1", ROOT_FOLDER, "s1-reports", "Reports")
        .add_file("S1", "s1-reports", "s1-q1", "q1.pdf", 4096)
        .add_file("S1", "s1-reports", "s1-q2", "q2.pdf", 4096)
        .add_folder("S1", ROOT_FOLDER, "s1-archive", "Archive")
        .add_file("S1", "s1-archive", "s1-old", "old.docx", 512);
}

/// Three sites, each with a couple of files, plus mailboxes for two of them
#[allow(dead_code)] // Used in integration tests
pub fn tenant() -> FixtureDocument {
    let mut doc = finance_site();
    doc.add_site("S2", "Marketing")
        .add_file("S2", ROOT_FOLDER, "s2-plan", "Campaign Plan.pptx", 300)
        .add_file("S2", ROOT_FOLDER, "s2-logo", "logo.png", 50)
        .add_site("S3", "Legal")
        .add_file("S3", ROOT_FOLDER, "s3-nda", "nda.pdf", 700)
        .add_user("u-fin", "Finance Team", "finance.team@example.com")
        .add_attachment("u-fin", "a1", "invoice.pdf", "March invoice")
        .add_attachment("u-fin", "a2", "receipt.jpg", "Lunch")
        .add_user("u-mkt", "Marketing Desk", "marketing@example.com")
        .add_attachment("u-mkt", "a3", "brief.docx", "Spring brief")
        .add_user("u-bob", "Bob", "bob@example.com");
    doc
}

/// A site with `count` files at its root, named `file-000.txt` onwards
#[allow(dead_code)] // Used in integration tests
pub fn wide_site(count: usize) -> FixtureDocument {
    let mut doc = FixtureDocument::new();
    doc.add_site("W", "Wide");
    for i in 0..count {
        doc.add_file("W", ROOT_FOLDER, &format!("w-{i:03}"), &format!("file-{i:03}.txt"), 1);
    }
    doc
}

/// A site with `count` sibling folders holding one file each
#[allow(dead_code)] // Used in integration tests
pub fn many_folders_site(count: usize) -> FixtureDocument {
    let mut doc = FixtureDocument::new();
    doc.add_site("M", "Many");
    for i in 0..count {
        let folder = format!("m-folder-{i:03}");
        doc.add_folder("M", ROOT_FOLDER, &folder, &format!("Folder {i:03}"))
            .add_file("M", &folder, &format!("m-{i:03}"), &format!("doc-{i:03}.pdf"), 10);
    }
    doc
}

/// Bare content record for store-level tests
#[allow(dead_code)] // Used in integration tests
pub fn content_record(id: &str, name: &str, site_id: &str) -> IndexRecord {
    IndexRecord {
        id: id.to_string(),
        name: name.to_string(),
        file_type: file_type_from_name(name),
        source: Source::Content,
        url: String::new(),
        owner: None,
        created_at: None,
        modified_at: None,
        parent_site_id: site_id.to_string(),
        size_bytes: 10,
        path: format!("/{name}"),
        mime_type: None,
    }
}

#[allow(dead_code)] // Used in integration tests
pub fn site(id: &str, name: &str) -> Site {
    Site {
        id: id.to_string(),
        name: name.to_string(),
        url: String::new(),
    }
}

/// Full content snapshot for one site
#[allow(dead_code)] // Used in integration tests
pub fn snapshot(site: &Site, records: Vec<IndexRecord>) -> MergeBatch {
    MergeBatch {
        site: site.clone(),
        source: Source::Content,
        records,
        full_snapshot: true,
        folders: 0,
    }
}
