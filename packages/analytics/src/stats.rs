//! Two-sample comparison and simple distribution fits.

use crime_pattern_analytics_models::{NormalFit, PoissonFit, TTestResult};

use crate::AnalyticsError;
use crate::distribution::student_t_two_sided;

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance with `ddof` delta degrees of freedom.
#[allow(clippy::cast_precision_loss)]
fn variance(values: &[f64], ddof: usize) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - ddof) as f64
}

fn require(values: &[f64], required: usize) -> Result<(), AnalyticsError> {
    if values.len() < required {
        return Err(AnalyticsError::InsufficientData {
            required,
            actual: values.len(),
        });
    }
    Ok(())
}

/// Welch's unequal-variance t-test of `mean(a) == mean(b)`, two-sided.
///
/// # Errors
///
/// * [`AnalyticsError::InsufficientData`] if either sample has fewer than
///   two values
/// * [`AnalyticsError::ModelFitFailure`] if both samples have zero variance
#[allow(clippy::cast_precision_loss)]
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<TTestResult, AnalyticsError> {
    require(a, 2)?;
    require(b, 2)?;

    let (na, nb) = (a.len() as f64, b.len() as f64);
    let se_a = variance(a, 1) / na;
    let se_b = variance(b, 1) / nb;
    let se2 = se_a + se_b;
    if se2 == 0.0 {
        return Err(AnalyticsError::ModelFitFailure {
            message: "both samples have zero variance".to_string(),
        });
    }

    let t_statistic = (mean(a) - mean(b)) / se2.sqrt();
    // Welch–Satterthwaite
    let degrees_of_freedom =
        se2 * se2 / (se_a * se_a / (na - 1.0) + se_b * se_b / (nb - 1.0));
    let p_value = student_t_two_sided(t_statistic, degrees_of_freedom);

    Ok(TTestResult {
        t_statistic,
        degrees_of_freedom,
        p_value,
    })
}

/// Fits a Poisson rate to a count series.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] for an empty series.
pub fn poisson_fit(counts: &[f64]) -> Result<PoissonFit, AnalyticsError> {
    require(counts, 1)?;
    let lambda = mean(counts);
    let variance = variance(counts, 0);
    let dispersion_index = if lambda == 0.0 {
        f64::NAN
    } else {
        variance / lambda
    };
    Ok(PoissonFit {
        lambda,
        variance,
        dispersion_index,
    })
}

/// Fits a normal distribution by sample mean and standard deviation.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] for fewer than two values.
pub fn normal_fit(values: &[f64]) -> Result<NormalFit, AnalyticsError> {
    require(values, 2)?;
    Ok(NormalFit {
        mean: mean(values),
        std_dev: variance(values, 1).sqrt(),
    })
}
