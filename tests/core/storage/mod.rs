//! Index storage tests
//!
//! Tests for merge semantics and stable pagination of the in-memory index.

mod test_merge;
mod test_pagination;
