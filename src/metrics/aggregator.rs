use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{AggregateStats, Outcome};

/// Spawns the single consumer that owns the run's counters.
///
/// The task drains `outcome_rx` until every sender is dropped and the queue is
/// empty, then yields the folded stats.
#[must_use]
pub fn setup_outcome_aggregator(
    mut outcome_rx: mpsc::Receiver<Outcome>,
) -> JoinHandle<AggregateStats> {
    tokio::spawn(async move {
        let mut stats = AggregateStats::new();
        while let Some(outcome) = outcome_rx.recv().await {
            stats.record(&outcome);
        }
        debug!("Aggregator drained {} outcomes", stats.total());
        stats
    })
}
