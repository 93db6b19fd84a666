//! Core domain logic (protocol-agnostic)
//!
//! This module contains all business logic that is independent
//! of transport protocols (HTTP, CLI).
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types and Result alias
//! - **types**: Domain data structures
//! - **xdg**: XDG directory handling
//! - **text**: Unicode folding shared by storage and search
//! - **provider**: Remote provider contract and the JSON fixture provider
//! - **cache**: TTL cache with request coalescing for discovery calls
//! - **crawler**: Bounded-concurrency crawl with retry and cancellation
//! - **storage**: Incremental in-memory index
//! - **search**: Substring search over the index
//! - **jobs**: Single-flight job orchestration and progress
//! - **services**: Unified service container

pub mod cache;
pub mod config;
pub mod crawler;
pub mod error;
pub mod jobs;
pub mod provider;
pub mod search;
pub mod services;
pub mod storage;
pub mod text;
pub mod types;
pub mod xdg;

// Re-export key types for convenience
pub use config::Config;
pub use error::{Result, SiteIndexError};
pub use services::Services;
