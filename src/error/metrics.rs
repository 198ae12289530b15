use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Outcome channel closed before request {index} could report.")]
    OutcomeChannelClosed { index: u64 },
    #[error("Aggregated {folded} outcomes but dispatched {dispatched} requests.")]
    OutcomeCountMismatch { dispatched: u64, folded: u64 },
    #[error("Admission semaphore closed while scheduling request {index}.")]
    AdmissionClosed { index: u64 },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
