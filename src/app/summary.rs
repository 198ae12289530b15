use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::AppResult;
use crate::metrics::{FAILURE_SENTINEL, ResponseStatus, RunSummary};

const SUCCESS_STATUS: ResponseStatus = ResponseStatus::Code(200);

#[derive(Debug, Serialize)]
pub(crate) struct SummaryReport {
    pub(crate) total_time_us: u64,
    pub(crate) total_requests: u64,
    pub(crate) average_response_time_us: u64,
    pub(crate) cumulative_response_time_us: u64,
    /// Every status by numeric code; failures are keyed by `-1`.
    pub(crate) status_counts: BTreeMap<i32, u64>,
    pub(crate) status_200: u64,
    pub(crate) other_statuses: Vec<StatusCount>,
    pub(crate) failed_requests: u64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct StatusCount {
    pub(crate) code: u16,
    pub(crate) count: u64,
}

impl SummaryReport {
    pub(crate) fn from_summary(summary: &RunSummary) -> Self {
        let other_statuses = summary
            .stats
            .counts()
            .filter_map(|(status, count)| match status {
                ResponseStatus::Code(code) if status != SUCCESS_STATUS => {
                    Some(StatusCount { code, count })
                }
                ResponseStatus::Code(_) | ResponseStatus::Failed => None,
            })
            .collect();

        let status_counts: BTreeMap<i32, u64> = summary
            .stats
            .counts()
            .map(|(status, count)| (status.code(), count))
            .collect();
        let failed_requests = status_counts.get(&FAILURE_SENTINEL).copied().unwrap_or(0);

        Self {
            total_time_us: micros(summary.elapsed),
            total_requests: summary.stats.total(),
            average_response_time_us: micros(summary.average),
            cumulative_response_time_us: micros(summary.stats.cumulative_duration()),
            status_counts,
            status_200: summary.stats.count(SUCCESS_STATUS),
            other_statuses,
            failed_requests,
        }
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Report lines: status 200 first, then other codes ascending, failures last.
pub(crate) fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![
        "--- Summary Report ---".to_owned(),
        format!("Total time: {:?}", summary.elapsed),
        format!("Total requests: {}", summary.stats.total()),
        format!("Average response time: {:?}", summary.average),
        format!(
            "Status code 200: {} response(s)",
            summary.stats.count(SUCCESS_STATUS)
        ),
    ];

    let mut others = summary
        .stats
        .counts()
        .filter(|(status, _)| *status != SUCCESS_STATUS)
        .peekable();
    if others.peek().is_some() {
        lines.push("Requests with other status codes:".to_owned());
    }
    for (status, count) in others {
        if status.is_failure() {
            lines.push(format!("Failed requests: {}", count));
        } else {
            lines.push(format!(
                "Status code {}: {} response(s)",
                status.code(),
                count
            ));
        }
    }
    lines
}

pub(crate) fn print_summary(summary: &RunSummary) {
    println!();
    for line in summary_lines(summary) {
        println!("{}", line);
    }
}

/// # Errors
///
/// Returns an error when the report cannot be serialized.
pub(crate) fn print_json_summary(summary: &RunSummary) -> AppResult<()> {
    let report = SummaryReport::from_summary(summary);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
