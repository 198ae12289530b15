use std::sync::Arc;

use tracing::info;

use crate::{
    args::{OutputFormat, TesterArgs},
    domain::RunConfig,
    error::AppResult,
    http::{self, HttpExecutor, ProgressOutput, RequestExecutor},
    metrics::RunSummary,
};

use super::summary;

/// Runs one load test described by `args` and prints its summary.
///
/// # Errors
///
/// Returns an error when the arguments are invalid, the HTTP client cannot be
/// built, or the run's accounting is inconsistent.
pub(crate) async fn run_local(args: &TesterArgs) -> AppResult<RunSummary> {
    let config = RunConfig::from_args(args)?;
    let text_output = matches!(args.output_format, OutputFormat::Text);
    if text_output {
        print_banner(&config);
    }

    let client = http::build_client(&config)?;
    let executor: Arc<dyn RequestExecutor> = Arc::new(HttpExecutor::new(client));
    let progress = if text_output {
        ProgressOutput::Stdout
    } else {
        ProgressOutput::Log
    };

    info!(
        "Sending {} {} requests to {}",
        config.total_requests.get(),
        config.request.method,
        config.request.url
    );
    let run_summary = http::dispatch(executor, &config, progress).await?;

    match args.output_format {
        OutputFormat::Text => summary::print_summary(&run_summary),
        OutputFormat::Json => summary::print_json_summary(&run_summary)?,
    }
    Ok(run_summary)
}

fn print_banner(config: &RunConfig) {
    println!("Starting stress test...");
    println!(
        "URL: {}, Method: {}, Requests: {}, Concurrency: {}",
        config.request.url,
        config.request.method,
        config.total_requests.get(),
        config.concurrency.get()
    );
    if !config.request.body.is_empty() {
        println!("Body: {}", config.request.body);
    }
}
