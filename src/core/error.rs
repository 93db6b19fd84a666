//! Error types and error handling for the siteindex service.
//!
//! This module defines the error types used throughout the
//! application. Protocol-specific mapping (HTTP status codes) is
//! handled in the respective adapter modules.

use thiserror::Error;

use crate::core::provider::ProviderError;

/// Result type alias for siteindex operations
pub type Result<T> = std::result::Result<T, SiteIndexError>;

/// Main error type for the siteindex service
#[derive(Error, Debug)]
pub enum SiteIndexError {
    #[error("An indexing job is already running: {0}")]
    AlreadyRunning(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Site discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl SiteIndexError {
    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(self, SiteIndexError::JobNotFound(_))
    }

    /// Check if this is a conflict error (a job is already running)
    pub fn is_conflict(&self) -> bool {
        matches!(self, SiteIndexError::AlreadyRunning(_))
    }

    /// Check if this is a bad request error (invalid input)
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            SiteIndexError::InvalidSelection(_)
                | SiteIndexError::InvalidQuery(_)
                | SiteIndexError::ConfigError(_)
        )
    }
}
