pub(crate) const DEFAULT_USER_AGENT: &str = concat!("stress-test/", env!("CARGO_PKG_VERSION"));

pub(crate) const DEFAULT_REQUESTS: &str = "10";
pub(crate) const DEFAULT_CONCURRENCY: &str = "1";

/// Config files checked in the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG_FILES: [&str; 2] = ["stress-test.toml", "stress-test.json"];
