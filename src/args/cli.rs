use clap::Parser;

use super::defaults::{DEFAULT_CONCURRENCY, DEFAULT_REQUESTS};
use super::parsers::{parse_header, parse_positive_u64, parse_positive_usize};
use super::types::{HttpMethod, OutputFormat, PositiveU64, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    name = "stress-test",
    version,
    about = "A simple CLI tool for stress testing APIs.",
    long_about = "A simple CLI tool for stress testing APIs.\n\
It sends a fixed number of requests to a target URL with bounded concurrency and \
reports per-status counts with total and average response times."
)]
pub struct TesterArgs {
    /// Target URL (required unless set in config)
    #[arg(long, short)]
    pub url: Option<String>,

    /// HTTP method: GET, HEAD, PATCH, POST, PUT, DELETE
    #[arg(long, short = 'X', default_value = "get", ignore_case = true)]
    pub method: HttpMethod,

    /// Number of requests
    #[arg(
        long,
        short = 'r',
        default_value = DEFAULT_REQUESTS,
        value_parser = parse_positive_u64
    )]
    pub requests: PositiveU64,

    /// Number of concurrent requests
    #[arg(
        long,
        short = 'c',
        default_value = DEFAULT_CONCURRENCY,
        value_parser = parse_positive_usize
    )]
    pub concurrency: PositiveUsize,

    /// Seconds a request keeps its concurrency slot after finishing before releasing it
    #[arg(long, short = 'i', default_value_t = 0)]
    pub interval: u64,

    /// Request body (for POST, PUT, PATCH)
    #[arg(long, short = 'd', alias = "body", default_value = "")]
    pub data: String,

    /// HTTP headers in 'Key: Value' format (repeatable)
    #[arg(long, short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Content-Type header (shortcut)
    #[arg(long = "content-type", short = 'T')]
    pub content_type: Option<String>,

    /// Path to a TOML or JSON config file
    #[arg(long)]
    pub config: Option<String>,

    /// Summary output format
    #[arg(long = "output-format", value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable colored log output
    #[arg(long = "no-color")]
    pub no_color: bool,
}
