#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loading, normalization, aggregation, and append persistence for the
//! state/district incidence dataset.
//!
//! The backing store is a single CSV file. [`loader`] turns it into a
//! cleaned [`Dataset`](crime_pattern_dataset_models::Dataset),
//! [`aggregate`] builds per-year series for a selected region, and
//! [`append`] writes new observations back with an atomic replace.
//! [`store::DatasetStore`] ties the read and write paths together with an
//! explicit cache.

pub mod aggregate;
pub mod append;
pub mod loader;
pub mod normalize;
pub mod paths;
pub mod store;

pub use aggregate::aggregate;
pub use append::{AppendOutcome, append_record};
pub use loader::{clean, load};
pub use store::DatasetStore;

use thiserror::Error;

/// Errors that can occur while reading or writing the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A required column is absent from the store header.
    #[error("Missing required column: {column}")]
    MissingColumn {
        /// Name of the missing column.
        column: String,
    },

    /// A submitted record does not fit the store schema.
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        /// Description of what went wrong.
        message: String,
    },

    /// Persisting the store failed.
    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        /// Path that was being written.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Reading the store failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV parsing or encoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
