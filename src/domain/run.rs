use std::collections::BTreeMap;
use std::time::Duration;

use crate::args::{HttpMethod, PositiveU64, PositiveUsize, TesterArgs};
use crate::error::{AppError, AppResult, ValidationError};

const CONTENT_TYPE: &str = "Content-Type";

/// The request every task sends. Built once per run and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub url: String,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

impl RequestSpec {
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: String::new(),
            headers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Later values replace earlier ones for the same key.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers
            .keys()
            .any(|key| key.eq_ignore_ascii_case(name))
    }
}

/// Everything the dispatcher needs for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub request: RequestSpec,
    pub total_requests: PositiveU64,
    pub concurrency: PositiveUsize,
    /// Time a worker holds its slot after its request finishes.
    pub interval: Duration,
}

impl RunConfig {
    /// Resolves CLI/config arguments into a validated run description.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL is missing, malformed, or not http(s).
    pub fn from_args(args: &TesterArgs) -> AppResult<Self> {
        let url = validate_url(args.url.as_deref())?;

        let mut request = RequestSpec::new(args.method, url).with_body(args.data.clone());
        for (key, value) in &args.headers {
            request = request.with_header(key.as_str(), value.as_str());
        }
        if let Some(content_type) = args.content_type.as_ref()
            && !request.has_header(CONTENT_TYPE)
        {
            request = request.with_header(CONTENT_TYPE, content_type.as_str());
        }

        Ok(Self {
            request,
            total_requests: args.requests,
            concurrency: args.concurrency,
            interval: Duration::from_secs(args.interval),
        })
    }
}

fn validate_url(url: Option<&str>) -> AppResult<String> {
    let raw = url.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(AppError::validation(ValidationError::MissingUrl));
    }
    let parsed = url::Url::parse(raw).map_err(|err| {
        AppError::validation(ValidationError::InvalidUrl {
            url: raw.to_owned(),
            source: err,
        })
    })?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::validation(ValidationError::UnsupportedScheme {
                scheme: other.to_owned(),
            }));
        }
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AppError::validation(ValidationError::UrlMissingHost));
    }
    Ok(raw.to_owned())
}
