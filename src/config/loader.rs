use std::path::{Path, PathBuf};

use crate::args::DEFAULT_CONFIG_FILES;
use crate::error::{AppError, AppResult, ConfigError};

use super::types::ConfigFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub(crate) fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return Err(ConfigError::MissingExtension);
        };
        if ext.eq_ignore_ascii_case("toml") {
            Ok(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(ConfigError::UnsupportedExtension {
                ext: ext.to_owned(),
            })
        }
    }

    fn parse(self, path: &Path, content: &str) -> Result<ConfigFile, ConfigError> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|err| ConfigError::ParseToml {
                path: path.to_path_buf(),
                source: err,
            }),
            Self::Json => serde_json::from_str(content).map_err(|err| ConfigError::ParseJson {
                path: path.to_path_buf(),
                source: err,
            }),
        }
    }
}

/// Loads the config named by `--config`, or the first default file present
/// in the working directory. Returns `None` when neither applies.
///
/// # Errors
///
/// Returns an error when the config file cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> AppResult<Option<ConfigFile>> {
    match resolve_config_path(path) {
        Some(path) => {
            tracing::debug!("Using config file {}", path.display());
            load_config_file(&path).map(Some)
        }
        None => Ok(None),
    }
}

/// An explicit path is returned as-is, even if it does not exist.
pub(crate) fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    explicit.map(PathBuf::from).or_else(|| {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file())
    })
}

pub(crate) fn load_config_file(path: &Path) -> AppResult<ConfigFile> {
    let format = ConfigFormat::from_path(path).map_err(AppError::config)?;
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    format.parse(path, &content).map_err(AppError::config)
}
