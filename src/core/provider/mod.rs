//! Remote provider contract.
//!
//! The crawler only talks to the document/mail service through the
//! [`ProviderClient`] trait. Every call may come back with
//! [`ProviderError::RateLimited`], which is distinct from a hard
//! failure and is retried by the crawler with backoff.

pub mod fixture;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{MailboxUser, Site};

pub use fixture::{FixtureDocument, FixtureProvider};

/// Result alias for provider calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors surfaced by a provider call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Rate limited by provider (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Provider temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Access denied: {0}")]
    Denied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider call failed: {0}")]
    Failed(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("Cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Errors worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. } | ProviderError::Unavailable(_)
        )
    }
}

/// A folder or file returned from a folder listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DriveEntry {
    Folder {
        id: String,
        name: String,
    },
    File {
        id: String,
        name: String,
        #[serde(default)]
        url: String,
        #[serde(default)]
        size: u64,
        #[serde(default)]
        created_by: Option<String>,
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
        #[serde(default)]
        modified_at: Option<DateTime<Utc>>,
        #[serde(default)]
        mime_type: Option<String>,
    },
}

/// An attachment on a message in a user's mailbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub entries: Vec<T>,
    pub next_page: Option<String>,
}

/// Folder id that addresses a site's library root
pub const ROOT_FOLDER: &str = "root";

/// Abstract access to the remote content/mail service.
///
/// Implementations must be `Send + Sync`; the crawler shares one
/// client across all of its workers.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// List every site visible to the tenant
    async fn list_sites(&self) -> ProviderResult<Vec<Site>>;

    /// List one page of a folder's children
    async fn list_folder_page(
        &self,
        site_id: &str,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> ProviderResult<Listing<DriveEntry>>;

    /// List every user that owns a mailbox
    async fn list_mailbox_users(&self) -> ProviderResult<Vec<MailboxUser>>;

    /// List one page of a user's message attachments
    async fn list_attachments(
        &self,
        user_id: &str,
        page_token: Option<&str>,
    ) -> ProviderResult<Listing<AttachmentEntry>>;
}
