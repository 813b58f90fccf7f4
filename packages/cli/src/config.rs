//! Configuration loading and store-path resolution.

use std::path::{Path, PathBuf};

use crime_pattern_analytics_models::AnalysisConfig;
use crime_pattern_dataset::paths;
use thiserror::Error;

/// File name looked up in the project root when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "crime_pattern.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Path of the config file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`AnalysisConfig`].
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// Path of the config file.
        path: String,
        /// Underlying parse error.
        source: toml::de::Error,
    },
}

/// Loads the analysis configuration.
///
/// An explicit `path` must exist. Without one, `crime_pattern.toml` in the
/// project root is used when present, and built-in defaults otherwise.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed.
pub fn load(path: Option<&Path>) -> Result<AnalysisConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = paths::project_root().join(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                log::debug!("No config file found, using defaults");
                return Ok(AnalysisConfig::default());
            }
            default
        }
    };

    let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let config = parse(&text).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;

    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

fn parse(text: &str) -> Result<AnalysisConfig, toml::de::Error> {
    toml::from_str(text)
}

/// Resolves the store path: the `--data` flag, then `CRIME_PATTERN_DATA`,
/// then `data_path` from the config, then the default location.
#[must_use]
pub fn store_path(config: &AnalysisConfig, flag: Option<PathBuf>) -> PathBuf {
    resolve_store_path(flag, paths::store_path_from_env(), config)
}

fn resolve_store_path(
    flag: Option<PathBuf>,
    env: Option<PathBuf>,
    config: &AnalysisConfig,
) -> PathBuf {
    flag.or(env)
        .or_else(|| config.data_path.clone())
        .unwrap_or_else(paths::default_store_path)
}
