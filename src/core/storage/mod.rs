//! In-memory index storage.
//!
//! The index lives entirely in process memory and is rebuilt by
//! crawling; nothing is persisted. [`IndexStore`] owns every
//! [`IndexRecord`](crate::core::types::IndexRecord) and is mutated only
//! through [`IndexStore::merge`].

mod index;

pub use index::{IndexStore, MergeBatch, MergeOutcome, StoredRecord};
