//! Percentile bootstrap confidence intervals.
//!
//! Each resample draws from its own generator seeded from the caller's seed
//! and the resample index, so a run is reproducible whether resamples are
//! evaluated serially or (with the `rayon` feature) in parallel.

use crime_pattern_analytics_models::{BootstrapParams, BootstrapResult, Statistic};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{AnalyticsError, check_confidence};

/// Odd 64-bit constant used to spread resample indices across seeds.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Estimates `statistic` on `values` and a percentile confidence interval
/// from `params.resamples` resamples drawn with replacement.
///
/// # Errors
///
/// * [`AnalyticsError::InsufficientData`] if fewer than two values are given
/// * [`AnalyticsError::InvalidParameter`] if `resamples` is zero or
///   `confidence` is outside `(0, 1)`
pub fn bootstrap_ci<F>(
    values: &[f64],
    statistic: F,
    params: &BootstrapParams,
) -> Result<BootstrapResult, AnalyticsError>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    if values.len() < 2 {
        return Err(AnalyticsError::InsufficientData {
            required: 2,
            actual: values.len(),
        });
    }
    if params.resamples == 0 {
        return Err(AnalyticsError::InvalidParameter {
            name: "resamples".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    check_confidence(params.confidence)?;

    let estimate = statistic(values);

    let mut distribution = resample_statistics(values, &statistic, params.resamples, params.seed);
    distribution.sort_by(f64::total_cmp);

    let alpha = 1.0 - params.confidence;
    let lower = percentile(&distribution, alpha / 2.0);
    let upper = percentile(&distribution, 1.0 - alpha / 2.0);

    log::debug!(
        "Bootstrap over {} values, {} resamples: {estimate} ({lower}, {upper})",
        values.len(),
        params.resamples
    );

    Ok(BootstrapResult {
        estimate,
        lower,
        upper,
        confidence: params.confidence,
        resamples: params.resamples,
    })
}

/// [`bootstrap_ci`] for one of the named [`Statistic`]s.
///
/// # Errors
///
/// Same as [`bootstrap_ci`].
pub fn bootstrap_statistic(
    values: &[f64],
    statistic: Statistic,
    params: &BootstrapParams,
) -> Result<BootstrapResult, AnalyticsError> {
    bootstrap_ci(values, |sample| statistic.apply(sample), params)
}

fn resample_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add((index as u64).wrapping_mul(SEED_STRIDE)))
}

fn resample_once<F>(values: &[f64], statistic: &F, seed: u64, index: usize) -> f64
where
    F: Fn(&[f64]) -> f64,
{
    let mut rng = resample_rng(seed, index);
    let n = values.len();
    let sample: Vec<f64> = (0..n).map(|_| values[rng.gen_range(0..n)]).collect();
    statistic(&sample)
}

#[cfg(feature = "rayon")]
fn resample_statistics<F>(values: &[f64], statistic: &F, resamples: usize, seed: u64) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    use rayon::prelude::*;

    (0..resamples)
        .into_par_iter()
        .map(|i| resample_once(values, statistic, seed, i))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn resample_statistics<F>(values: &[f64], statistic: &F, resamples: usize, seed: u64) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    (0..resamples)
        .map(|i| resample_once(values, statistic, seed, i))
        .collect()
}

/// Linear-interpolation percentile of an ascending slice, `q` in `[0, 1]`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return f64::NAN;
    };
    let rank = q.clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    if lo == hi {
        sorted[lo]
    } else {
        frac.mul_add(sorted[hi] - sorted[lo], sorted[lo])
    }
}
