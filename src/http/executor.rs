use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Request};
use tokio::time::Instant;
use tracing::warn;

use crate::args::DEFAULT_USER_AGENT;
use crate::domain::RequestSpec;
use crate::error::HttpError;
use crate::metrics::{Outcome, Task};

/// Performs exactly one request per call.
///
/// Implementations never fail: every error is reported as a failed outcome
/// carrying the time spent until the failure.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, task: Task, request: &RequestSpec) -> Outcome;
}

/// Executor backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, task: Task, request: &RequestSpec) -> Outcome {
        let start = Instant::now();
        let built = match build_request(&self.client, request) {
            Ok(built) => built,
            Err(err) => {
                warn!("request {} failed: {}", display_index(task), err);
                return Outcome::failure(task, start.elapsed());
            }
        };

        match self.client.execute(built).await {
            Ok(response) => {
                let elapsed = start.elapsed();
                // The body is never read; dropping the response discards it.
                Outcome::success(task, response.status().as_u16(), elapsed)
            }
            Err(err) => {
                let elapsed = start.elapsed();
                warn!("request {} failed: {}", display_index(task), err);
                Outcome::failure(task, elapsed)
            }
        }
    }
}

pub(super) fn build_headers(request: &RequestSpec) -> Result<HeaderMap, HttpError> {
    let mut headers = HeaderMap::with_capacity(request.headers.len().saturating_add(1));
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    for (key, value) in &request.headers {
        let name =
            HeaderName::from_bytes(key.as_bytes()).map_err(|err| HttpError::InvalidHeaderName {
                header: key.clone(),
                source: err,
            })?;
        let value = HeaderValue::from_str(value).map_err(|err| HttpError::InvalidHeaderValue {
            header: key.clone(),
            source: err,
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn build_request(client: &Client, request: &RequestSpec) -> Result<Request, HttpError> {
    let headers = build_headers(request)?;
    let mut builder = client
        .request(request.method.into(), request.url.as_str())
        .headers(headers);
    if !request.body.is_empty() {
        builder = builder.body(request.body.clone());
    }
    builder
        .build()
        .map_err(|err| HttpError::BuildRequestFailed { source: err })
}

const fn display_index(task: Task) -> u64 {
    task.index.saturating_add(1)
}
