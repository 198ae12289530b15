//! HTTP request execution and bounded-concurrency dispatch.
mod client;
mod dispatcher;
mod executor;
mod progress;

#[cfg(test)]
mod tests;

pub use client::build_client;
pub use dispatcher::dispatch;
pub use executor::{HttpExecutor, RequestExecutor};
pub use progress::ProgressOutput;
