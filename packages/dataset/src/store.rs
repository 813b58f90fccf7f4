//! Cached access to the backing store.
//!
//! [`DatasetStore`] memoizes the cleaned [`Dataset`] keyed by the store
//! file's modification time and length. Appends made through the store
//! drop the cache immediately; changes made by anyone else are picked up on
//! the next [`DatasetStore::dataset`] call once the file stamp differs.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crime_pattern_dataset_models::{Dataset, NewRecord};

use crate::append::{AppendOutcome, append_record};
use crate::{DatasetError, loader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Result<Self, DatasetError> {
        let meta = std::fs::metadata(path).map_err(|e| DatasetError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

#[derive(Debug)]
struct Cached {
    stamp: FileStamp,
    dataset: Dataset,
}

/// The backing store plus an explicit cache of its cleaned contents.
#[derive(Debug)]
pub struct DatasetStore {
    path: PathBuf,
    cache: Option<Cached>,
}

impl DatasetStore {
    /// Creates a store handle for the CSV file at `path`. Nothing is read
    /// until [`Self::dataset`] is called.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: None,
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cleaned dataset, reloading it if the file changed since
    /// the last load.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file cannot be read or cleaned.
    pub fn dataset(&mut self) -> Result<&Dataset, DatasetError> {
        let stamp = FileStamp::of(&self.path)?;

        let cached = match self.cache.take() {
            Some(cached) if cached.stamp == stamp => cached,
            _ => {
                log::debug!("Loading {} (cache stale or empty)", self.path.display());
                Cached {
                    stamp,
                    dataset: loader::load(&self.path)?,
                }
            }
        };

        Ok(&self.cache.insert(cached).dataset)
    }

    /// Drops the cached dataset so the next read reloads from disk.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Whether a cleaned dataset is currently cached.
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Appends `record` to the store and invalidates the cache.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if validation or persistence fails. The
    /// cache is left untouched in that case.
    pub fn append(&mut self, record: &NewRecord) -> Result<AppendOutcome, DatasetError> {
        let outcome = append_record(&self.path, record)?;
        self.invalidate();
        Ok(outcome)
    }
}
