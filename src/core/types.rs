//! Core data types for the siteindex service.
//!
//! This module defines the entities stored in the index, the job
//! status model exposed to polling clients, and the request and
//! response shapes shared by the HTTP and CLI adapters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discoverable content container (a site with document libraries)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// A mailbox owner returned by the provider's user listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxUser {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub mail: String,
}

/// Where an indexed record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// A file in a site's document libraries
    Content,
    /// An attachment found in a mailbox
    Mail,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Content => "content",
            Source::Mail => "mail",
        }
    }
}

/// A single indexed entity: a provider file or an email attachment.
///
/// `id` is the provider's stable identifier, so a later crawl of the
/// same entity replaces this record instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub name: String,

    /// Upper-cased extension, or `UNKNOWN`
    #[serde(rename = "type")]
    pub file_type: String,

    pub source: Source,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,

    pub parent_site_id: String,

    #[serde(default)]
    pub size_bytes: u64,

    /// Folder path for content files, message subject for attachments
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Derive the record type from a file name.
///
/// Returns the upper-cased extension, or `UNKNOWN` when the name has
/// no usable extension.
pub fn file_type_from_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_uppercase(),
        _ => "UNKNOWN".to_string(),
    }
}

/// Aggregate figures for one site, recomputed on every merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub site_id: String,
    pub site_name: String,
    pub site_url: String,
    pub total_files: usize,
    pub total_folders: usize,
    pub total_size: u64,
    pub last_indexed: DateTime<Utc>,
}

/// Derived view over the whole index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_sites: usize,
    pub total_files: usize,
    pub total_folders: usize,
    pub total_size: u64,

    /// File type histogram (e.g. `{"PDF": 10, "DOCX": 5}`)
    pub file_types: BTreeMap<String, usize>,

    pub sites: Vec<SiteSummary>,
    pub last_indexed: Option<DateTime<Utc>>,
}

/// What to crawl for one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSelection {
    pub site_id: String,
    #[serde(default = "default_true")]
    pub index_content: bool,
    #[serde(default = "default_true")]
    pub index_mail: bool,
}

fn default_true() -> bool {
    true
}

impl SiteSelection {
    pub fn content_only(site_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            index_content: true,
            index_mail: false,
        }
    }

    pub fn mail_only(site_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            index_content: false,
            index_mail: true,
        }
    }
}

/// Lifecycle of an indexing job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal states stay put until the next job or a full reset
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

/// An error that stopped part of one site's crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteFailure {
    pub site_id: String,
    pub site_name: String,
    pub message: String,
}

/// Point-in-time view of a job, as served to polling clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub sites_total: usize,
    pub sites_processed: usize,
    pub files_processed: usize,
    pub folders_processed: usize,
    pub current_site: Option<String>,
    pub current_folder: Option<String>,

    /// Fraction in `[0, 1]`; reaches 1.0 only once the job completes
    pub progress: f64,

    pub error_message: Option<String>,
    pub cancel_requested: bool,
    pub site_errors: Vec<SiteFailure>,
}

impl JobSnapshot {
    pub fn new(job_id: String, sites_total: usize) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            completed_at: None,
            sites_total,
            sites_processed: 0,
            files_processed: 0,
            folders_processed: 0,
            current_site: None,
            current_folder: None,
            progress: 0.0,
            error_message: None,
            cancel_requested: false,
            site_errors: Vec::new(),
        }
    }
}

/// One page of records plus the full match count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPage {
    pub items: Vec<IndexRecord>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Request to start an indexing job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub sites: Vec<SiteSelection>,
}

/// Response from starting an indexing job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub job_id: String,
    pub status: JobStatus,
}

/// Response from site discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesResponse {
    pub sites: Vec<Site>,
    pub total: usize,
}

/// Acknowledgement for cancel and reset operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub status: String,
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
