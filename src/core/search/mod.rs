//! Search module for case-insensitive substring search.
//!
//! This module provides search and filtered listing over the
//! in-memory index, with Unicode folding on both sides of the match.

mod engine;
mod query;

pub use engine::SearchService;
pub use query::prepare_query;
