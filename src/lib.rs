//! siteindex - crawl-and-index engine for document sites and mailboxes
//!
//! Crawls a tenant's document libraries and mailbox attachments through
//! a provider client, keeps an incrementally updated in-memory index of
//! file metadata, and serves paginated listing and search over it.
//!
//! # Architecture
//!
//! The codebase is organized into three main modules:
//!
//! - **core**: Domain logic (protocol-agnostic)
//!   - config, error, types, xdg, text
//!   - provider (client contract, JSON fixture provider)
//!   - cache (discovery memoization)
//!   - crawler (scheduler, retry)
//!   - storage (incremental index)
//!   - search (substring queries)
//!   - jobs (orchestrator, progress tracker)
//!   - services (unified service container)
//!
//! - **http**: REST API adapter (depends on core)
//!   - handlers, middleware
//!
//! - **cli**: Command-line adapter (depends on core)
//!
//! # Key Features
//!
//! - One indexing job at a time, with cooperative cancellation
//! - Bounded crawl concurrency with backoff on rate limits
//! - Incremental merges that prune deleted entities
//! - Unicode-aware case-insensitive search

// Core domain logic (protocol-agnostic)
pub mod core;

// HTTP REST adapter
pub mod http;

// Command-line adapter
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{Result, SiteIndexError};
pub use core::services::Services;
pub use core::storage::IndexStore;
pub use core::types::*;
