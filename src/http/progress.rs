use tracing::debug;

use crate::metrics::{Outcome, ResponseStatus};

/// Where the per-request progress line goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutput {
    /// Print one line per completed request to stdout.
    Stdout,
    /// Emit the line at debug level only.
    Log,
}

impl ProgressOutput {
    pub(super) fn emit(self, outcome: &Outcome) {
        let line = progress_line(outcome);
        match self {
            ProgressOutput::Stdout => println!("{}", line),
            ProgressOutput::Log => debug!("{}", line),
        }
    }
}

/// Request numbers are 1-based for display.
pub(super) fn progress_line(outcome: &Outcome) -> String {
    let number = outcome.index.saturating_add(1);
    match outcome.status {
        ResponseStatus::Code(code) => format!(
            "Request {}: Status Code: {} ({:?})",
            number, code, outcome.duration
        ),
        ResponseStatus::Failed => format!("Request {}: failed ({:?})", number, outcome.duration),
    }
}
