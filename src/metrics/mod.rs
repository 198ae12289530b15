//! Outcome types and their aggregation.
mod aggregator;
mod types;


pub use aggregator::setup_outcome_aggregator;
pub use types::{AggregateStats, FAILURE_SENTINEL, Outcome, ResponseStatus, RunSummary, Task};
