use serde::Deserialize;

use crate::args::{HttpMethod, OutputFormat};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    pub requests: Option<u64>,
    pub concurrency: Option<usize>,
    pub interval: Option<u64>,
    #[serde(alias = "body")]
    pub data: Option<String>,
    pub headers: Option<Vec<String>>,
    pub content_type: Option<String>,
    pub output_format: Option<OutputFormat>,
}
