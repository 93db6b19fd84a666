//! Indexing job tests
//!
//! Tests for job lifecycle, single-flight admission, cancellation
//! and incremental re-indexing across jobs.

mod test_incremental;
