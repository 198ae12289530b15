use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::domain::RunConfig;
use crate::error::{AppError, AppResult, MetricsError};
use crate::metrics::{Outcome, RunSummary, Task, setup_outcome_aggregator};

use super::executor::RequestExecutor;
use super::progress::ProgressOutput;

/// Runs `config.total_requests` tasks with at most `config.concurrency` in flight.
///
/// Tasks are admitted in index order; each holds one slot from admission until
/// its outcome has been queued for aggregation and the configured interval has
/// elapsed. Returns once every outcome has been folded.
///
/// # Errors
///
/// Returns an error when a worker task panics or when the number of folded
/// outcomes does not match the number of dispatched tasks.
pub async fn dispatch<E>(
    executor: Arc<E>,
    config: &RunConfig,
    progress: ProgressOutput,
) -> AppResult<RunSummary>
where
    E: RequestExecutor + ?Sized + 'static,
{
    let total_requests = config.total_requests.get();
    let concurrency = slot_capacity(config);
    let interval = config.interval;
    let request = Arc::new(config.request.clone());

    let permits = Arc::new(Semaphore::new(concurrency));
    let (outcome_tx, outcome_rx) = mpsc::channel::<Outcome>(concurrency);
    let aggregator = setup_outcome_aggregator(outcome_rx);
    let mut workers: JoinSet<Result<(), MetricsError>> = JoinSet::new();

    debug!(
        "Dispatching {} requests with concurrency {}",
        total_requests, concurrency
    );
    let run_start = Instant::now();

    for index in 0..total_requests {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            return Err(AppError::metrics(MetricsError::AdmissionClosed { index }));
        };

        let executor = Arc::clone(&executor);
        let request = Arc::clone(&request);
        let outcome_tx = outcome_tx.clone();
        workers.spawn(async move {
            let outcome = executor.execute(Task { index }, &request).await;
            progress.emit(&outcome);
            let queued = outcome_tx.send(outcome).await;
            // The slot stays taken through the interval: it limits how fast
            // slots recycle, not how fast requests start while slots are free.
            if !interval.is_zero() {
                sleep(interval).await;
            }
            drop(permit);
            queued.map_err(|err| MetricsError::OutcomeChannelClosed { index: err.0.index })
        });

        while let Some(joined) = workers.try_join_next() {
            joined??;
        }
    }
    drop(outcome_tx);

    while let Some(joined) = workers.join_next().await {
        joined??;
    }
    let stats = aggregator.await?;
    let elapsed = run_start.elapsed();

    if stats.total() != total_requests {
        return Err(AppError::metrics(MetricsError::OutcomeCountMismatch {
            dispatched: total_requests,
            folded: stats.total(),
        }));
    }
    debug!("Run finished in {:?}", elapsed);

    Ok(RunSummary::new(elapsed, stats))
}

/// Usable number of slots: never more than the run has requests, nor than a
/// semaphore can hold.
pub(super) fn slot_capacity(config: &RunConfig) -> usize {
    let total = usize::try_from(config.total_requests.get()).unwrap_or(usize::MAX);
    config
        .concurrency
        .get()
        .min(total)
        .min(Semaphore::MAX_PERMITS)
}
