//! In-process provider backed by a JSON fixture.
//!
//! Serves sites, folder trees, mailbox users and attachments from a
//! [`FixtureDocument`] with real pagination. Faults can be injected per
//! call key to simulate throttling and permission errors:
//!
//! - `sites`, `users`
//! - `folder:{site_id}:{folder_id}:{page}` (pages are 1-based)
//! - `attachments:{user_id}:{page}`

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SiteIndexError};
use crate::core::provider::{
    AttachmentEntry, DriveEntry, Listing, ProviderClient, ProviderError, ProviderResult,
    ROOT_FOLDER,
};
use crate::core::types::{MailboxUser, Site};

/// Serialized provider contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureDocument {
    #[serde(default)]
    pub sites: Vec<Site>,

    /// site id -> folder id -> children
    #[serde(default)]
    pub folders: BTreeMap<String, BTreeMap<String, Vec<DriveEntry>>>,

    #[serde(default)]
    pub users: Vec<MailboxUser>,

    /// user id -> attachments
    #[serde(default)]
    pub attachments: BTreeMap<String, Vec<AttachmentEntry>>,
}

impl FixtureDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_site(&mut self, id: &str, name: &str) -> &mut Self {
        self.sites.push(Site {
            id: id.to_string(),
            name: name.to_string(),
            url: format!("https://tenant.example.com/sites/{id}"),
        });
        self.folders.entry(id.to_string()).or_default();
        self
    }

    pub fn add_folder(&mut self, site_id: &str, parent: &str, id: &str, name: &str) -> &mut Self {
        let tree = self.folders.entry(site_id.to_string()).or_default();
        tree.entry(parent.to_string())
            .or_default()
            .push(DriveEntry::Folder {
                id: id.to_string(),
                name: name.to_string(),
            });
        tree.entry(id.to_string()).or_default();
        self
    }

    pub fn add_file(
        &mut self,
        site_id: &str,
        folder: &str,
        id: &str,
        name: &str,
        size: u64,
    ) -> &mut Self {
        self.folders
            .entry(site_id.to_string())
            .or_default()
            .entry(folder.to_string())
            .or_default()
            .push(DriveEntry::File {
                id: id.to_string(),
                name: name.to_string(),
                url: format!("https://tenant.example.com/sites/{site_id}/{id}"),
                size,
                created_by: None,
                created_at: None,
                modified_at: None,
                mime_type: None,
            });
        self
    }

    /// Replace or insert a file entry, keeping its position
    pub fn put_file(&mut self, site_id: &str, folder: &str, entry: DriveEntry) -> &mut Self {
        let children = self
            .folders
            .entry(site_id.to_string())
            .or_default()
            .entry(folder.to_string())
            .or_default();
        let target = match &entry {
            DriveEntry::File { id, .. } | DriveEntry::Folder { id, .. } => id.clone(),
        };
        match children.iter_mut().find(|e| entry_id(e) == target) {
            Some(existing) => *existing = entry,
            None => children.push(entry),
        }
        self
    }

    /// Remove an entry from a folder by id
    pub fn remove_entry(&mut self, site_id: &str, folder: &str, id: &str) -> &mut Self {
        if let Some(children) = self
            .folders
            .get_mut(site_id)
            .and_then(|tree| tree.get_mut(folder))
        {
            children.retain(|e| entry_id(e) != id);
        }
        self
    }

    pub fn add_user(&mut self, id: &str, display_name: &str, mail: &str) -> &mut Self {
        self.users.push(MailboxUser {
            id: id.to_string(),
            display_name: display_name.to_string(),
            mail: mail.to_string(),
        });
        self
    }

    pub fn add_attachment(
        &mut self,
        user_id: &str,
        id: &str,
        name: &str,
        subject: &str,
    ) -> &mut Self {
        self.attachments
            .entry(user_id.to_string())
            .or_default()
            .push(AttachmentEntry {
                id: id.to_string(),
                name: name.to_string(),
                subject: subject.to_string(),
                url: String::new(),
                size: 0,
                sender: None,
                received_at: None,
                mime_type: None,
            });
        self
    }
}

fn entry_id(entry: &DriveEntry) -> &str {
    match entry {
        DriveEntry::File { id, .. } | DriveEntry::Folder { id, .. } => id,
    }
}

#[derive(Debug, Clone)]
enum Fault {
    RateLimited { remaining: u32 },
    Denied(String),
    Failed(String),
}

/// Provider that serves a [`FixtureDocument`]
pub struct FixtureProvider {
    document: Mutex<FixtureDocument>,
    page_size: usize,
    latency: Duration,
    faults: Mutex<HashMap<String, Fault>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FixtureProvider {
    pub fn new(document: FixtureDocument) -> Self {
        Self {
            document: Mutex::new(document),
            page_size: 100,
            latency: Duration::ZERO,
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Load a fixture from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SiteIndexError::ConfigError(format!("Failed to read fixture {path:?}: {e}"))
        })?;
        let document: FixtureDocument = serde_json::from_str(&contents)?;
        Ok(Self::new(document))
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every call, so crawls can be observed mid-flight
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answer the next `times` calls for `key` with a rate-limit signal
    pub fn rate_limit(&self, key: &str, times: u32) {
        self.set_fault(key, Fault::RateLimited { remaining: times });
    }

    /// Answer every call for `key` with an access denial
    pub fn deny(&self, key: &str, message: &str) {
        self.set_fault(key, Fault::Denied(message.to_string()));
    }

    /// Answer every call for `key` with a hard failure
    pub fn fail(&self, key: &str, message: &str) {
        self.set_fault(key, Fault::Failed(message.to_string()));
    }

    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.clear();
        }
    }

    /// Mutate the served document (e.g. to simulate deletions between runs)
    pub fn update<F: FnOnce(&mut FixtureDocument)>(&self, f: F) {
        if let Ok(mut doc) = self.document.lock() {
            f(&mut doc);
        }
    }

    /// Number of calls made to one operation (`list_sites`, `list_folder_page`,
    /// `list_mailbox_users`, `list_attachments`)
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn set_fault(&self, key: &str, fault: Fault) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert(key.to_string(), fault);
        }
    }

    async fn enter(&self, operation: &'static str, key: &str) -> ProviderResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(operation).or_insert(0) += 1;
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut faults = self
            .faults
            .lock()
            .map_err(|e| ProviderError::Failed(format!("fixture lock poisoned: {e}")))?;

        match faults.get_mut(key) {
            Some(Fault::RateLimited { remaining }) if *remaining > 0 => {
                *remaining -= 1;
                Err(ProviderError::RateLimited { retry_after: None })
            }
            Some(Fault::Denied(msg)) => Err(ProviderError::Denied(msg.clone())),
            Some(Fault::Failed(msg)) => Err(ProviderError::Failed(msg.clone())),
            _ => Ok(()),
        }
    }

    fn document(&self) -> ProviderResult<FixtureDocument> {
        self.document
            .lock()
            .map(|doc| doc.clone())
            .map_err(|e| ProviderError::Failed(format!("fixture lock poisoned: {e}")))
    }

    fn paginate<T: Clone>(&self, items: &[T], page_token: Option<&str>) -> ProviderResult<Listing<T>> {
        let page = parse_page(page_token)?;
        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(items.len());
        let entries = if start < items.len() {
            items[start..end].to_vec()
        } else {
            Vec::new()
        };
        let next_page = (end < items.len()).then(|| (page + 1).to_string());
        Ok(Listing { entries, next_page })
    }
}

fn parse_page(page_token: Option<&str>) -> ProviderResult<usize> {
    match page_token {
        None => Ok(1),
        Some(token) => token
            .parse::<usize>()
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| ProviderError::Failed(format!("invalid page token: {token}"))),
    }
}

#[async_trait]
impl ProviderClient for FixtureProvider {
    async fn list_sites(&self) -> ProviderResult<Vec<Site>> {
        self.enter("list_sites", "sites").await?;
        Ok(self.document()?.sites)
    }

    async fn list_folder_page(
        &self,
        site_id: &str,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> ProviderResult<Listing<DriveEntry>> {
        let page = parse_page(page_token)?;
        self.enter(
            "list_folder_page",
            &format!("folder:{site_id}:{folder_id}:{page}"),
        )
        .await?;

        let document = self.document()?;
        if !document.sites.iter().any(|s| s.id == site_id) {
            return Err(ProviderError::NotFound(format!("site {site_id}")));
        }

        let children = document
            .folders
            .get(site_id)
            .and_then(|tree| tree.get(folder_id));

        match children {
            Some(children) => self.paginate(children, page_token),
            None if folder_id == ROOT_FOLDER => Ok(Listing {
                entries: Vec::new(),
                next_page: None,
            }),
            None => Err(ProviderError::NotFound(format!(
                "folder {folder_id} in site {site_id}"
            ))),
        }
    }

    async fn list_mailbox_users(&self) -> ProviderResult<Vec<MailboxUser>> {
        self.enter("list_mailbox_users", "users").await?;
        Ok(self.document()?.users)
    }

    async fn list_attachments(
        &self,
        user_id: &str,
        page_token: Option<&str>,
    ) -> ProviderResult<Listing<AttachmentEntry>> {
        let page = parse_page(page_token)?;
        self.enter("list_attachments", &format!("attachments:{user_id}:{page}"))
            .await?;

        let document = self.document()?;
        match document.attachments.get(user_id) {
            Some(items) => self.paginate(items, page_token),
            None => Err(ProviderError::NotFound(format!("mailbox for {user_id}"))),
        }
    }
}
