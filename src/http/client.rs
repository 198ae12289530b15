use reqwest::Client;
use tracing::error;

use crate::domain::RunConfig;
use crate::error::{AppError, AppResult, HttpError};

use super::dispatcher::slot_capacity;

/// Builds the client shared by every worker of a run.
///
/// No request timeout is configured; calls are bounded only by the transport.
///
/// # Errors
///
/// Returns an error when the TLS backend or connection pool cannot be set up.
pub fn build_client(config: &RunConfig) -> AppResult<Client> {
    match Client::builder()
        .pool_max_idle_per_host(slot_capacity(config))
        .build()
    {
        Ok(client) => Ok(client),
        Err(err) => {
            error!("Failed to build HTTP client: {}", err);
            Err(AppError::http(HttpError::BuildClientFailed { source: err }))
        }
    }
}
