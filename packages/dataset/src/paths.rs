#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the incidence store.
//!
//! All paths are relative to the project root's `data/` directory.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the store location.
pub const DATA_PATH_ENV: &str = "CRIME_PATTERN_DATA";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`. Falls back to the
/// manifest directory itself if it has fewer than two ancestors.
#[must_use]
pub fn project_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .ancestors()
        .nth(2)
        .unwrap_or(manifest)
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the default store path, `data/crime_data.csv`.
#[must_use]
pub fn default_store_path() -> PathBuf {
    data_dir().join("crime_data.csv")
}

/// Returns the store path from [`DATA_PATH_ENV`] if set and non-empty.
#[must_use]
pub fn store_path_from_env() -> Option<PathBuf> {
    std::env::var(DATA_PATH_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}
