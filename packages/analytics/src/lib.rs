#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistical estimation, forecasting, and similarity ranking over the
//! state/district incidence dataset.
//!
//! Every operation takes its inputs explicitly (a
//! [`Dataset`](crime_pattern_dataset_models::Dataset), an
//! [`AggregatedSeries`](crime_pattern_dataset_models::AggregatedSeries), or a
//! plain slice) and returns a typed result. Failures are never swallowed:
//! each one maps to an [`AnalyticsError`] variant so the caller can decide
//! what to show instead.

pub mod bootstrap;
pub mod distribution;
pub mod forecast;
pub mod optimize;
pub mod similarity;
pub mod stats;
pub mod summary;

pub use bootstrap::{bootstrap_ci, bootstrap_statistic};
pub use forecast::{forecast, forecast_crime};
pub use similarity::{
    build_feature_matrix, build_similarity_graph, cosine_similarity, recommend_similar,
    similarity_matrix, top_districts_by_crime,
};
pub use stats::{normal_fit, poisson_fit, welch_t_test};
pub use summary::{composition, correlation_matrix, crime_totals};

use thiserror::Error;

/// Errors that can occur during analysis.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Too few values to estimate a statistic.
    #[error("Insufficient data: need at least {required} values, got {actual}")]
    InsufficientData {
        /// Minimum number of values.
        required: usize,
        /// Number of values provided.
        actual: usize,
    },

    /// Too few observations to fit a forecast model.
    #[error("Insufficient history: need at least {required} years, got {actual}")]
    InsufficientHistory {
        /// Minimum number of years.
        required: usize,
        /// Number of years provided.
        actual: usize,
    },

    /// The yearly series has a gap.
    #[error("Non-contiguous series: expected year {expected}, found {found}")]
    NonContiguousSeries {
        /// The year that should have come next.
        expected: i32,
        /// The year that was found instead.
        found: i32,
    },

    /// The model could not be fitted to the data.
    #[error("Model fit failed: {message}")]
    ModelFitFailure {
        /// Description of what went wrong.
        message: String,
    },

    /// The requested region is not in the feature matrix.
    #[error("Region not found: {key}")]
    KeyNotFound {
        /// Display form of the missing region.
        key: String,
    },

    /// A parameter is outside its valid range.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Validates a confidence level in the open interval `(0, 1)`.
pub(crate) fn check_confidence(confidence: f64) -> Result<(), AnalyticsError> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidParameter {
            name: "confidence".to_string(),
            reason: format!("must be in (0, 1), got {confidence}"),
        })
    }
}
