use super::dispatcher::slot_capacity;
use super::executor::build_headers;
use super::progress::progress_line;
use super::*;
use crate::args::{HttpMethod, PositiveU64, PositiveUsize};
use crate::domain::{RequestSpec, RunConfig};
use crate::error::{AppError, AppResult};
use crate::metrics::{Outcome, ResponseStatus, Task};
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

fn run_config(total: u64, concurrency: usize, interval: Duration) -> AppResult<RunConfig> {
    Ok(RunConfig {
        request: RequestSpec::new(HttpMethod::Get, "http://stub.invalid/"),
        total_requests: PositiveU64::try_from(total)?,
        concurrency: PositiveUsize::try_from(concurrency)?,
        interval,
    })
}

/// Tracks how many calls overlap and in which order they start.
#[derive(Default)]
struct StubExecutor {
    delay: Duration,
    fail_from: Option<u64>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicU64,
    started: Mutex<Vec<u64>>,
    started_at: Mutex<Vec<tokio::time::Instant>>,
}

impl StubExecutor {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn failing_from(index: u64) -> Self {
        Self {
            fail_from: Some(index),
            ..Self::default()
        }
    }

    fn started(&self) -> Vec<u64> {
        self.started
            .lock()
            .map(|started| started.clone())
            .unwrap_or_default()
    }

    fn start_times(&self) -> Vec<tokio::time::Instant> {
        let mut times = self
            .started_at
            .lock()
            .map(|times| times.clone())
            .unwrap_or_default();
        times.sort();
        times
    }
}

#[async_trait]
impl RequestExecutor for StubExecutor {
    async fn execute(&self, task: Task, _request: &RequestSpec) -> Outcome {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        let start = tokio::time::Instant::now();
        if let Ok(mut started) = self.started.lock() {
            started.push(task.index);
        }
        if let Ok(mut started_at) = self.started_at.lock() {
            started_at.push(start);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.fail_from {
            Some(limit) if task.index >= limit => Outcome::failure(task, start.elapsed()),
            Some(_) | None => Outcome::success(task, 200, start.elapsed()),
        }
    }
}

#[test]
fn dispatch_counts_every_request_for_any_concurrency() -> AppResult<()> {
    run_async_test(async {
        for concurrency in [1usize, 2, 10] {
            let executor = Arc::new(StubExecutor::with_delay(Duration::from_millis(10)));
            let config = run_config(10, concurrency, Duration::ZERO)?;
            let summary = dispatch(Arc::clone(&executor), &config, ProgressOutput::Log).await?;

            if summary.stats.total() != 10 || summary.stats.count(ResponseStatus::Code(200)) != 10
            {
                return Err(AppError::http(format!(
                    "Unexpected stats at concurrency {}: {:?}",
                    concurrency, summary.stats
                )));
            }
            if executor.calls.load(Ordering::SeqCst) != 10 {
                return Err(AppError::http("Executor call count mismatch"));
            }
            if summary.average < Duration::from_millis(10)
                || summary.average > Duration::from_millis(100)
            {
                return Err(AppError::http(format!(
                    "Unexpected average at concurrency {}: {:?}",
                    concurrency, summary.average
                )));
            }
        }
        Ok(())
    })
}

#[test]
fn dispatch_counts_failures_under_the_sentinel() -> AppResult<()> {
    run_async_test(async {
        let executor = Arc::new(StubExecutor::failing_from(0));
        let config = run_config(12, 4, Duration::ZERO)?;
        let summary = dispatch(executor, &config, ProgressOutput::Log).await?;

        let counts: Vec<_> = summary.stats.counts().collect();
        if counts != vec![(ResponseStatus::Failed, 12)] {
            return Err(AppError::http(format!("Unexpected counts: {:?}", counts)));
        }
        Ok(())
    })
}

#[test]
fn dispatch_mixed_outcomes_are_independent_of_interleaving() -> AppResult<()> {
    run_async_test(async {
        for _ in 0..5 {
            let executor = Arc::new(StubExecutor {
                delay: Duration::from_millis(2),
                fail_from: Some(7),
                ..StubExecutor::default()
            });
            let config = run_config(10, 3, Duration::ZERO)?;
            let summary = dispatch(executor, &config, ProgressOutput::Log).await?;

            let counts: Vec<_> = summary.stats.counts().collect();
            if counts != vec![(ResponseStatus::Code(200), 7), (ResponseStatus::Failed, 3)] {
                return Err(AppError::http(format!("Unexpected counts: {:?}", counts)));
            }
        }
        Ok(())
    })
}

#[test]
fn dispatch_never_exceeds_concurrency() -> AppResult<()> {
    run_async_test(async {
        let executor = Arc::new(StubExecutor::with_delay(Duration::from_millis(5)));
        let config = run_config(40, 4, Duration::ZERO)?;
        let summary = dispatch(Arc::clone(&executor), &config, ProgressOutput::Log).await?;

        let max = executor.max_in_flight.load(Ordering::SeqCst);
        if max > 4 {
            return Err(AppError::http(format!("Observed {} concurrent calls", max)));
        }
        if max < 2 {
            return Err(AppError::http(format!(
                "Expected calls to overlap, max was {}",
                max
            )));
        }
        if summary.stats.total() != 40 {
            return Err(AppError::http("Unexpected total"));
        }
        Ok(())
    })
}

#[test]
fn dispatch_holds_slots_through_the_interval() -> AppResult<()> {
    run_async_test(async {
        let interval = Duration::from_millis(30);
        let executor = Arc::new(StubExecutor::default());
        let config = run_config(12, 3, interval)?;
        dispatch(Arc::clone(&executor), &config, ProgressOutput::Log).await?;

        // A slot is taken from admission until its interval elapses, so no
        // four starts fit inside one interval.
        let starts = executor.start_times();
        if starts.len() != 12 {
            return Err(AppError::http(format!("Unexpected starts: {}", starts.len())));
        }
        for window in starts.windows(4) {
            if let (Some(first), Some(last)) = (window.first(), window.last())
                && last.duration_since(*first) < interval
            {
                return Err(AppError::http(format!(
                    "Four requests started within {:?}",
                    last.duration_since(*first)
                )));
            }
        }
        if let (Some(first), Some(third)) = (starts.first(), starts.get(2))
            && third.duration_since(*first) >= interval
        {
            return Err(AppError::http("Expected the first three slots to start together"));
        }
        Ok(())
    })
}

#[test]
fn dispatch_caps_oversized_concurrency() -> AppResult<()> {
    run_async_test(async {
        let executor = Arc::new(StubExecutor::with_delay(Duration::from_millis(1)));
        let config = run_config(2, usize::MAX, Duration::ZERO)?;
        if slot_capacity(&config) != 2 {
            return Err(AppError::http(format!(
                "Unexpected capacity: {}",
                slot_capacity(&config)
            )));
        }
        let summary = dispatch(Arc::clone(&executor), &config, ProgressOutput::Log).await?;
        if summary.stats.count(ResponseStatus::Code(200)) != 2 {
            return Err(AppError::http(format!("Unexpected stats: {:?}", summary.stats)));
        }

        let huge = run_config(u64::MAX, usize::MAX, Duration::ZERO)?;
        if slot_capacity(&huge) > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(AppError::http("Capacity exceeds semaphore limit"));
        }
        Ok(())
    })
}

#[test]
fn dispatch_admits_in_index_order() -> AppResult<()> {
    run_async_test(async {
        let executor = Arc::new(StubExecutor::with_delay(Duration::from_millis(1)));
        let config = run_config(15, 1, Duration::ZERO)?;
        dispatch(Arc::clone(&executor), &config, ProgressOutput::Log).await?;

        let started = executor.started();
        let expected: Vec<u64> = (0..15).collect();
        if started != expected {
            return Err(AppError::http(format!("Unexpected start order: {:?}", started)));
        }
        Ok(())
    })
}

#[test]
fn interval_holds_the_slot_after_each_request() -> AppResult<()> {
    run_async_test(async {
        let interval = Duration::from_millis(40);

        let serial = run_config(3, 1, interval)?;
        let summary =
            dispatch(Arc::new(StubExecutor::default()), &serial, ProgressOutput::Log).await?;
        if summary.elapsed < Duration::from_millis(120) {
            return Err(AppError::http(format!(
                "Expected each slot to be held for the interval, run took {:?}",
                summary.elapsed
            )));
        }
        if summary.average > interval {
            return Err(AppError::http(
                "The interval must not count towards request duration",
            ));
        }

        let parallel = run_config(3, 3, interval)?;
        let summary =
            dispatch(Arc::new(StubExecutor::default()), &parallel, ProgressOutput::Log).await?;
        if summary.elapsed >= Duration::from_millis(120) {
            return Err(AppError::http(format!(
                "Expected free slots to start immediately, run took {:?}",
                summary.elapsed
            )));
        }
        Ok(())
    })
}

#[test]
fn progress_line_reports_number_status_and_failure() -> AppResult<()> {
    let ok = Outcome::success(Task { index: 0 }, 201, Duration::from_millis(5));
    if progress_line(&ok) != "Request 1: Status Code: 201 (5ms)" {
        return Err(AppError::http(format!("Unexpected line: {}", progress_line(&ok))));
    }
    let failed = Outcome::failure(Task { index: 9 }, Duration::from_millis(3));
    if progress_line(&failed) != "Request 10: failed (3ms)" {
        return Err(AppError::http(format!(
            "Unexpected line: {}",
            progress_line(&failed)
        )));
    }
    Ok(())
}

#[test]
fn caller_headers_override_default_user_agent() -> AppResult<()> {
    let defaults = build_headers(&RequestSpec::new(HttpMethod::Get, "http://localhost"))?;
    let default_ua = defaults
        .get(http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !default_ua.starts_with("stress-test/") {
        return Err(AppError::http(format!("Unexpected default UA: {}", default_ua)));
    }

    let spec = RequestSpec::new(HttpMethod::Get, "http://localhost")
        .with_header("user-agent", "custom/1.0")
        .with_header("X-Trace", "abc");
    let headers = build_headers(&spec)?;
    if headers.len() != 2 {
        return Err(AppError::http(format!("Unexpected headers: {:?}", headers)));
    }
    if headers.get(http::header::USER_AGENT).map(|value| value.as_bytes()) != Some(b"custom/1.0") {
        return Err(AppError::http("Expected caller User-Agent to win"));
    }
    Ok(())
}

/// Minimal HTTP/1.1 server answering every request with `status`.
async fn spawn_status_server(status: u16) -> AppResult<(String, mpsc::UnboundedReceiver<String>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (request_tx, request_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let request_tx = request_tx.clone();
            tokio::spawn(async move {
                let mut raw = Vec::new();
                let mut buffer = [0u8; 1024];
                loop {
                    match stream.read(&mut buffer).await {
                        Ok(0) | Err(_) => return,
                        Ok(read) => {
                            raw.extend_from_slice(buffer.get(..read).unwrap_or_default());
                            if raw.windows(4).any(|window| window == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }
                drop(request_tx.send(String::from_utf8_lossy(&raw).into_owned()));
                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK",
                    status
                );
                if stream.write_all(response.as_bytes()).await.is_err() {
                    return;
                }
                drop(stream.shutdown().await);
            });
        }
    });

    Ok((format!("http://{}/", addr), request_rx))
}

fn test_client() -> AppResult<reqwest::Client> {
    build_client(&run_config(1, 1, Duration::ZERO)?)
}

#[test]
fn http_executor_treats_error_statuses_as_responses() -> AppResult<()> {
    run_async_test(async {
        let (url, mut requests) = spawn_status_server(404).await?;
        let executor = HttpExecutor::new(test_client()?);
        let spec = RequestSpec::new(HttpMethod::Post, url)
            .with_body("payload")
            .with_header("X-Test", "1");

        let outcome = executor.execute(Task { index: 0 }, &spec).await;
        if outcome.status != ResponseStatus::Code(404) {
            return Err(AppError::http(format!("Unexpected outcome: {:?}", outcome)));
        }

        let raw = requests
            .recv()
            .await
            .ok_or_else(|| AppError::http("Server saw no request"))?
            .to_ascii_lowercase();
        if !raw.starts_with("post / http/1.1") {
            return Err(AppError::http(format!("Unexpected request line: {}", raw)));
        }
        if !raw.contains("user-agent: stress-test/") || !raw.contains("x-test: 1") {
            return Err(AppError::http(format!("Missing headers: {}", raw)));
        }
        Ok(())
    })
}

#[test]
fn http_executor_reports_connection_failures() -> AppResult<()> {
    run_async_test(async {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let executor = HttpExecutor::new(test_client()?);
        let spec = RequestSpec::new(HttpMethod::Get, format!("http://{}/", addr));
        let outcome = executor.execute(Task { index: 3 }, &spec).await;
        if outcome.status != ResponseStatus::Failed || outcome.index != 3 {
            return Err(AppError::http(format!("Unexpected outcome: {:?}", outcome)));
        }
        Ok(())
    })
}

#[test]
fn http_executor_reports_construction_failures() -> AppResult<()> {
    run_async_test(async {
        let executor = HttpExecutor::new(test_client()?);

        let bad_header = RequestSpec::new(HttpMethod::Get, "http://127.0.0.1:9/")
            .with_header("bad header", "x");
        let outcome = executor.execute(Task { index: 0 }, &bad_header).await;
        if !outcome.status.is_failure() {
            return Err(AppError::http("Expected invalid header name to fail"));
        }

        let bad_url = RequestSpec::new(HttpMethod::Get, "not a url");
        let outcome = executor.execute(Task { index: 1 }, &bad_url).await;
        if !outcome.status.is_failure() {
            return Err(AppError::http("Expected invalid URL to fail"));
        }
        Ok(())
    })
}

#[test]
fn dispatch_against_live_server() -> AppResult<()> {
    run_async_test(async {
        let (url, _requests) = spawn_status_server(200).await?;
        let mut config = run_config(20, 5, Duration::ZERO)?;
        config.request = RequestSpec::new(HttpMethod::Get, url);

        let executor = Arc::new(HttpExecutor::new(build_client(&config)?));
        let summary = dispatch(executor, &config, ProgressOutput::Log).await?;

        let counts: Vec<_> = summary.stats.counts().collect();
        if counts != vec![(ResponseStatus::Code(200), 20)] {
            return Err(AppError::http(format!("Unexpected counts: {:?}", counts)));
        }
        if summary.elapsed < summary.average {
            return Err(AppError::http("Run time shorter than one request"));
        }
        Ok(())
    })
}
