use std::collections::BTreeMap;
use std::time::Duration;

/// Reported in place of a status code when no HTTP response was received.
pub const FAILURE_SENTINEL: i32 = -1;

/// Status code of a received response, or a failure with no response at all.
///
/// Ordering puts every real code in ascending order before `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResponseStatus {
    Code(u16),
    Failed,
}

impl ResponseStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            ResponseStatus::Code(code) => code as i32,
            ResponseStatus::Failed => FAILURE_SENTINEL,
        }
    }

    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, ResponseStatus::Failed)
    }
}

/// One logical request instance; all tasks share the run's request spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub index: u64,
}

/// Result of executing one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub index: u64,
    pub status: ResponseStatus,
    pub duration: Duration,
}

impl Outcome {
    #[must_use]
    pub const fn success(task: Task, code: u16, duration: Duration) -> Self {
        Self {
            index: task.index,
            status: ResponseStatus::Code(code),
            duration,
        }
    }

    #[must_use]
    pub const fn failure(task: Task, duration: Duration) -> Self {
        Self {
            index: task.index,
            status: ResponseStatus::Failed,
            duration,
        }
    }
}

/// Running fold of outcomes into per-status counts and cumulative latency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    counts: BTreeMap<ResponseStatus, u64>,
    cumulative_duration: Duration,
    total: u64,
}

impl AggregateStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &Outcome) {
        let count = self.counts.entry(outcome.status).or_insert(0);
        *count = count.saturating_add(1);
        self.cumulative_duration = self.cumulative_duration.saturating_add(outcome.duration);
        self.total = self.total.saturating_add(1);
    }

    #[must_use]
    pub fn count(&self, status: ResponseStatus) -> u64 {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Per-status counts in ascending code order, failures last.
    pub fn counts(&self) -> impl Iterator<Item = (ResponseStatus, u64)> + '_ {
        self.counts.iter().map(|(status, count)| (*status, *count))
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub const fn cumulative_duration(&self) -> Duration {
        self.cumulative_duration
    }

    /// Cumulative duration divided by the number of outcomes, zero when empty.
    #[must_use]
    pub fn average_duration(&self) -> Duration {
        if self.total == 0 {
            return Duration::ZERO;
        }
        let nanos = self
            .cumulative_duration
            .as_nanos()
            .checked_div(u128::from(self.total))
            .unwrap_or(0);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Final, immutable result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub stats: AggregateStats,
    pub average: Duration,
}

impl RunSummary {
    #[must_use]
    pub fn new(elapsed: Duration, stats: AggregateStats) -> Self {
        let average = stats.average_duration();
        Self {
            elapsed,
            stats,
            average,
        }
    }
}
