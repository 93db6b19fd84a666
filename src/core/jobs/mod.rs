//! Indexing job lifecycle: single-flight start, progress, cancel, reset.

mod orchestrator;
mod tracker;

pub use orchestrator::JobOrchestrator;
pub use tracker::JobTracker;
