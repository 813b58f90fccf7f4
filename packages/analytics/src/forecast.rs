//! ARIMA(p, d, q) forecasting of yearly incidence totals.
//!
//! The model is fitted by conditional sum of squares (CSS) on the
//! `d`-times differenced series. AR and MA coefficients are optimized in an
//! unconstrained space and mapped through partial autocorrelations, which
//! keeps the fitted AR polynomial stationary and the MA polynomial
//! invertible. A mean term is only estimated when `d == 0`.
//!
//! Point forecasts are produced recursively on the differenced scale and
//! integrated back. Interval half-widths use the psi-weights of the
//! integrated model and a two-sided normal quantile.

use crime_pattern_analytics_models::{ArimaOrder, FittedArima, ForecastPoint, ForecastResult};
use crime_pattern_crime_models::CrimeType;
use crime_pattern_dataset_models::{AggregatedSeries, YearValue};

use crate::distribution::two_sided_z;
use crate::optimize::{NelderMead, minimize};
use crate::{AnalyticsError, check_confidence};

/// Minimum number of observed years.
pub const MIN_HISTORY: usize = 3;
/// Largest accepted AR or MA order.
pub const MAX_ARMA_ORDER: usize = 5;
/// Largest accepted differencing order.
pub const MAX_DIFFERENCING: usize = 2;

/// Initial simplex step for the unconstrained AR/MA parameters.
const COEFFICIENT_STEP: f64 = 0.5;
const ITERATIONS_PER_PARAMETER: usize = 500;

/// Fits an ARIMA model to `series` and forecasts `steps` years past the
/// last observed year.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidParameter`] if an order exceeds its bound or
///   `confidence` is outside `(0, 1)`
/// * [`AnalyticsError::InsufficientHistory`] if fewer than three years are
///   given
/// * [`AnalyticsError::NonContiguousSeries`] if the years are not strictly
///   consecutive
/// * [`AnalyticsError::ModelFitFailure`] if the values are not finite or
///   too few observations remain after differencing
pub fn forecast(
    series: &[YearValue],
    order: ArimaOrder,
    steps: usize,
    confidence: f64,
) -> Result<ForecastResult, AnalyticsError> {
    validate_order(order)?;
    check_confidence(confidence)?;

    if series.len() < MIN_HISTORY {
        return Err(AnalyticsError::InsufficientHistory {
            required: MIN_HISTORY,
            actual: series.len(),
        });
    }
    check_contiguous(series)?;
    let last_year = series.last().map_or(0, |point| point.year);
    check_horizon(last_year, steps)?;

    let values: Vec<f64> = series.iter().map(|point| point.value).collect();
    let model = ArimaModel::fit(&values, order)?;

    log::debug!(
        "Fitted {order} on {} years: ar={:?} ma={:?} sigma2={}",
        series.len(),
        model.ar,
        model.ma,
        model.sigma2
    );

    let means = model.predict(steps);
    let psi = model.psi_weights(steps);
    let z = two_sided_z(confidence);

    let mut cumulative = 0.0;
    let points = means
        .into_iter()
        .zip(psi)
        .zip(1..)
        .map(|((mean, weight), horizon)| {
            cumulative = weight.mul_add(weight, cumulative);
            let half_width = z * (model.sigma2 * cumulative).sqrt();
            ForecastPoint {
                year: last_year + horizon,
                mean,
                lower: mean - half_width,
                upper: mean + half_width,
            }
        })
        .collect();

    Ok(ForecastResult {
        order,
        confidence,
        points,
        model: model.summary(),
    })
}

/// Forecasts one crime column of an aggregated series.
///
/// # Errors
///
/// Same as [`forecast`].
pub fn forecast_crime(
    series: &AggregatedSeries,
    crime: CrimeType,
    order: ArimaOrder,
    steps: usize,
    confidence: f64,
) -> Result<ForecastResult, AnalyticsError> {
    forecast(&series.series(crime), order, steps, confidence)
}

fn validate_order(order: ArimaOrder) -> Result<(), AnalyticsError> {
    let invalid = |name: &str, max: usize| AnalyticsError::InvalidParameter {
        name: name.to_string(),
        reason: format!("must be <= {max}"),
    };
    if order.p > MAX_ARMA_ORDER {
        return Err(invalid("p", MAX_ARMA_ORDER));
    }
    if order.d > MAX_DIFFERENCING {
        return Err(invalid("d", MAX_DIFFERENCING));
    }
    if order.q > MAX_ARMA_ORDER {
        return Err(invalid("q", MAX_ARMA_ORDER));
    }
    Ok(())
}

fn check_contiguous(series: &[YearValue]) -> Result<(), AnalyticsError> {
    for pair in series.windows(2) {
        let Some(expected) = pair[0].year.checked_add(1) else {
            return Err(AnalyticsError::NonContiguousSeries {
                expected: pair[0].year,
                found: pair[1].year,
            });
        };
        if pair[1].year != expected {
            return Err(AnalyticsError::NonContiguousSeries {
                expected,
                found: pair[1].year,
            });
        }
    }
    Ok(())
}

/// Every forecast year must be representable.
fn check_horizon(last_year: i32, steps: usize) -> Result<(), AnalyticsError> {
    i32::try_from(steps)
        .ok()
        .and_then(|steps| last_year.checked_add(steps))
        .map(|_| ())
        .ok_or_else(|| AnalyticsError::InvalidParameter {
            name: "steps".to_string(),
            reason: format!("{steps} years past {last_year} overflows the year range"),
        })
}

fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Maps unconstrained values to the coefficients of a stationary
/// polynomial `1 - c_1 z - ... - c_k z^k`.
///
/// Each value becomes a partial autocorrelation in `(-1, 1)` via `tanh`,
/// and the Durbin–Levinson recursion turns those into coefficients.
fn pacf_to_coefficients(unconstrained: &[f64]) -> Vec<f64> {
    let mut coefficients: Vec<f64> = Vec::with_capacity(unconstrained.len());
    for (k, u) in unconstrained.iter().enumerate() {
        let r = u.tanh();
        let previous = coefficients.clone();
        for j in 0..k {
            coefficients[j] = (-r).mul_add(previous[k - 1 - j], previous[j]);
        }
        coefficients.push(r);
    }
    coefficients
}

/// A fitted model plus the state needed to forecast from it.
struct ArimaModel {
    order: ArimaOrder,
    ar: Vec<f64>,
    ma: Vec<f64>,
    mean: f64,
    sigma2: f64,
    css: f64,
    /// `levels[k]` is the series differenced `k` times, `k` in `0..=d`.
    levels: Vec<Vec<f64>>,
    residuals: Vec<f64>,
}

/// Coefficients decoded from an optimizer point.
struct Coefficients {
    ar: Vec<f64>,
    ma: Vec<f64>,
    mean: f64,
}

impl ArimaModel {
    fn fit(values: &[f64], order: ArimaOrder) -> Result<Self, AnalyticsError> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::ModelFitFailure {
                message: "series contains non-finite values".to_string(),
            });
        }
        if order.d >= values.len() {
            return Err(AnalyticsError::ModelFitFailure {
                message: format!(
                    "cannot difference {} values {} time(s)",
                    values.len(),
                    order.d
                ),
            });
        }

        let mut levels = vec![values.to_vec()];
        for k in 0..order.d {
            let next = difference(&levels[k]);
            levels.push(next);
        }
        let differenced = &levels[order.d];
        let n = differenced.len();
        if n <= order.p {
            return Err(AnalyticsError::ModelFitFailure {
                message: format!(
                    "{n} observation(s) after differencing is too few for AR order {}",
                    order.p
                ),
            });
        }

        let with_mean = order.d == 0;
        let unpack = |point: &[f64]| decode(point, order, with_mean);

        let initial_mean = mean(differenced);
        let deviations: Vec<f64> = differenced
            .iter()
            .map(|v| (v - initial_mean).powi(2))
            .collect();
        let spread = mean(&deviations).sqrt();

        let mut start = Vec::with_capacity(order.p + order.q + 1);
        let mut steps = Vec::with_capacity(order.p + order.q + 1);
        if with_mean {
            start.push(initial_mean);
            steps.push((0.5 * spread).max(1e-3 * (1.0 + initial_mean.abs())));
        }
        start.extend(std::iter::repeat_n(0.0, order.p + order.q));
        steps.extend(std::iter::repeat_n(COEFFICIENT_STEP, order.p + order.q));

        let options = NelderMead {
            max_iterations: ITERATIONS_PER_PARAMETER * start.len().max(1),
            ..NelderMead::default()
        };
        let minimum = minimize(
            |point| {
                let c = unpack(point);
                conditional_sum_of_squares(differenced, &c, order.p)
            },
            &start,
            &steps,
            options,
        );

        if !minimum.value.is_finite() {
            return Err(AnalyticsError::ModelFitFailure {
                message: "conditional sum of squares did not converge".to_string(),
            });
        }
        log::trace!(
            "{order} CSS optimization finished after {} iteration(s)",
            minimum.iterations
        );

        let coefficients = unpack(&minimum.point);
        let residuals = residuals(differenced, &coefficients, order.p);
        let css: f64 = residuals[order.p..].iter().map(|e| e * e).sum();
        #[allow(clippy::cast_precision_loss)]
        let sigma2 = css / (n - order.p) as f64;

        Ok(Self {
            order,
            ar: coefficients.ar,
            ma: coefficients.ma,
            mean: coefficients.mean,
            sigma2,
            css,
            levels,
            residuals,
        })
    }

    fn differenced(&self) -> &[f64] {
        &self.levels[self.order.d]
    }

    /// Point forecasts on the original scale.
    fn predict(&self, steps: usize) -> Vec<f64> {
        let n = self.differenced().len();
        let mut extended = self.differenced().to_vec();
        let mut errors = self.residuals.clone();

        for _ in 0..steps {
            let len = extended.len();
            let mut next = self.mean;
            for (i, phi) in self.ar.iter().enumerate() {
                next = phi.mul_add(extended[len - 1 - i] - self.mean, next);
            }
            for (j, theta) in self.ma.iter().enumerate() {
                if let Some(e) = errors.len().checked_sub(j + 1).map(|idx| errors[idx]) {
                    next = theta.mul_add(e, next);
                }
            }
            extended.push(next);
            errors.push(0.0);
        }

        let mut forecasts = extended.split_off(n);
        for level in self.levels[..self.order.d].iter().rev() {
            let mut acc = level.last().copied().unwrap_or(0.0);
            forecasts = forecasts
                .into_iter()
                .map(|delta| {
                    acc += delta;
                    acc
                })
                .collect();
        }
        forecasts
    }

    /// First `count` psi-weights of the integrated model.
    fn psi_weights(&self, count: usize) -> Vec<f64> {
        // (1 - phi_1 z - ... - phi_p z^p)(1 - z)^d
        let mut polynomial: Vec<f64> = std::iter::once(1.0)
            .chain(self.ar.iter().map(|phi| -phi))
            .collect();
        for _ in 0..self.order.d {
            let mut next = vec![0.0; polynomial.len() + 1];
            for (i, c) in polynomial.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            polynomial = next;
        }
        let integrated_ar: Vec<f64> = polynomial[1..].iter().map(|c| -c).collect();

        let mut psi: Vec<f64> = Vec::with_capacity(count);
        for j in 0..count {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut weight = self.ma.get(j - 1).copied().unwrap_or(0.0);
            for (i, phi) in integrated_ar.iter().enumerate().take(j) {
                weight = phi.mul_add(psi[j - 1 - i], weight);
            }
            psi.push(weight);
        }
        psi
    }

    fn summary(&self) -> FittedArima {
        FittedArima {
            ar: self.ar.clone(),
            ma: self.ma.clone(),
            mean: self.mean,
            sigma2: self.sigma2,
            css: self.css,
            observations: self.differenced().len() - self.order.p,
        }
    }
}

fn decode(point: &[f64], order: ArimaOrder, with_mean: bool) -> Coefficients {
    let (mean, rest) = if with_mean {
        (point[0], &point[1..])
    } else {
        (0.0, point)
    };
    Coefficients {
        ar: pacf_to_coefficients(&rest[..order.p]),
        ma: pacf_to_coefficients(&rest[order.p..])
            .into_iter()
            .map(|c| -c)
            .collect(),
        mean,
    }
}

/// One-step residuals conditioned on the first `p` observations, whose
/// residuals are fixed at zero.
fn residuals(differenced: &[f64], coefficients: &Coefficients, p: usize) -> Vec<f64> {
    let mut errors = vec![0.0; differenced.len()];
    for t in p..differenced.len() {
        let mut predicted = coefficients.mean;
        for (i, phi) in coefficients.ar.iter().enumerate() {
            predicted = phi.mul_add(differenced[t - 1 - i] - coefficients.mean, predicted);
        }
        for (j, theta) in coefficients.ma.iter().enumerate() {
            if t > j {
                predicted = theta.mul_add(errors[t - 1 - j], predicted);
            }
        }
        errors[t] = differenced[t] - predicted;
    }
    errors
}

fn conditional_sum_of_squares(differenced: &[f64], coefficients: &Coefficients, p: usize) -> f64 {
    residuals(differenced, coefficients, p)[p..]
        .iter()
        .map(|e| e * e)
        .sum()
}

#[cfg(test)]
mod tests {
    use crime_pattern_crime_models::CrimeCounts;
    use crime_pattern_dataset_models::YearlyTotals;

    use super::*;

    fn series(start: i32, values: &[f64]) -> Vec<YearValue> {
        values
            .iter()
            .zip(start..)
            .map(|(value, year)| YearValue {
                year,
                value: *value,
            })
            .collect()
    }

    fn order(p: usize, d: usize, q: usize) -> ArimaOrder {
        ArimaOrder { p, d, q }
    }

    #[test]
    fn two_years_is_insufficient_history() {
        match forecast(&series(2001, &[1.0, 2.0]), ArimaOrder::default(), 5, 0.95) {
            Err(AnalyticsError::InsufficientHistory { required, actual }) => {
                assert_eq!(required, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected InsufficientHistory, got {other:?}"),
        }
    }

    #[test]
    fn constant_series_forecasts_its_constant() {
        let result = forecast(&series(2001, &[10.0; 5]), ArimaOrder::default(), 5, 0.95).unwrap();
        assert_eq!(result.points.len(), 5);
        for point in &result.points {
            assert!((point.mean - 10.0).abs() < 1e-9);
            assert!((point.lower - 10.0).abs() < 1e-9);
            assert!((point.upper - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn forecast_years_follow_last_observation() {
        let result = forecast(&series(2008, &[3.0, 4.0, 6.0, 5.0]), order(1, 0, 0), 3, 0.95)
            .unwrap();
        let years: Vec<i32> = result.points.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2012, 2013, 2014]);
    }

    #[test]
    fn zero_steps_yields_no_points() {
        let result = forecast(&series(2001, &[1.0, 3.0, 2.0, 4.0]), ArimaOrder::default(), 0, 0.95)
            .unwrap();
        assert!(result.points.is_empty());
    }

    #[test]
    fn gap_in_years_is_rejected() {
        let mut points = series(2001, &[1.0, 2.0, 3.0]);
        points.push(YearValue {
            year: 2005,
            value: 4.0,
        });
        match forecast(&points, ArimaOrder::default(), 5, 0.95) {
            Err(AnalyticsError::NonContiguousSeries { expected, found }) => {
                assert_eq!(expected, 2004);
                assert_eq!(found, 2005);
            }
            other => panic!("expected NonContiguousSeries, got {other:?}"),
        }
    }

    #[test]
    fn forecast_years_past_i32_max_are_rejected() {
        let points: Vec<YearValue> = [i32::MAX - 2, i32::MAX - 1, i32::MAX]
            .into_iter()
            .zip([1.0, 2.0, 4.0])
            .map(|(year, value)| YearValue { year, value })
            .collect();

        assert!(matches!(
            forecast(&points, order(1, 1, 1), 1, 0.95),
            Err(AnalyticsError::InvalidParameter { name, .. }) if name == "steps"
        ));

        let last_two = &points[1..];
        let early: Vec<YearValue> = std::iter::once(YearValue {
            year: i32::MAX - 3,
            value: 0.0,
        })
        .chain(last_two.iter().copied())
        .collect();
        assert!(matches!(
            forecast(&early, order(0, 1, 0), 1, 0.95),
            Err(AnalyticsError::NonContiguousSeries { expected, found })
                if expected == i32::MAX - 2 && found == i32::MAX - 1
        ));
    }

    #[test]
    fn series_with_year_after_i32_max_is_not_contiguous() {
        let points = [
            YearValue {
                year: i32::MAX - 1,
                value: 1.0,
            },
            YearValue {
                year: i32::MAX,
                value: 2.0,
            },
            YearValue {
                year: 0,
                value: 3.0,
            },
        ];
        assert!(matches!(
            forecast(&points, order(0, 1, 0), 1, 0.95),
            Err(AnalyticsError::NonContiguousSeries { found: 0, .. })
        ));
    }

    #[test]
    fn order_bounds_are_enforced() {
        let points = series(2001, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        for (bad, name) in [(order(6, 0, 0), "p"), (order(0, 3, 0), "d"), (order(0, 0, 6), "q")] {
            assert!(matches!(
                forecast(&points, bad, 1, 0.95),
                Err(AnalyticsError::InvalidParameter { name: n, .. }) if n == name
            ));
        }
        assert!(matches!(
            forecast(&points, ArimaOrder::default(), 1, 1.0),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn degenerate_fits_fail() {
        let nan = series(2001, &[1.0, f64::NAN, 3.0, 4.0]);
        assert!(matches!(
            forecast(&nan, ArimaOrder::default(), 1, 0.95),
            Err(AnalyticsError::ModelFitFailure { .. })
        ));

        // Differencing twice leaves one value, not enough for AR(1)
        let short = series(2001, &[1.0, 4.0, 2.0]);
        assert!(matches!(
            forecast(&short, order(1, 2, 0), 1, 0.95),
            Err(AnalyticsError::ModelFitFailure { .. })
        ));
    }

    #[test]
    fn random_walk_intervals_grow_with_sqrt_horizon() {
        // Differences are all 1, so sigma2 = 1 and psi-weights are all 1
        let result = forecast(&series(2001, &[1.0, 2.0, 3.0, 4.0, 5.0]), order(0, 1, 0), 4, 0.95)
            .unwrap();
        let z = two_sided_z(0.95);
        for (h, point) in result.points.iter().enumerate() {
            assert!((point.mean - 5.0).abs() < 1e-12);
            #[allow(clippy::cast_precision_loss)]
            let expected = z * ((h + 1) as f64).sqrt();
            assert!((point.upper - point.mean - expected).abs() < 1e-9);
        }
        assert!((result.model.sigma2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn trending_series_extrapolates_upward() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let result = forecast(&series(2001, &values), order(1, 1, 0), 3, 0.95).unwrap();
        assert!(result.points[0].mean > 10.5);
        assert!(result.points[0].mean < result.points[1].mean);
        assert!(result.points[1].mean < result.points[2].mean);
    }

    #[test]
    fn oscillating_series_fits_negative_ar() {
        let values = [48.0, 52.0, 47.0, 53.0, 49.0, 51.0, 46.0, 54.0, 50.0, 50.0];
        let result = forecast(&series(2001, &values), order(1, 0, 0), 5, 0.95).unwrap();
        assert!(result.model.ar[0] < 0.0);
        assert!((result.model.mean - 50.0).abs() < 2.0);
        for point in &result.points {
            assert!(point.mean > 45.0 && point.mean < 55.0);
        }
    }

    #[test]
    fn intervals_bracket_mean_and_widen() {
        let values = [12.0, 15.0, 14.0, 18.0, 17.0, 21.0, 20.0, 24.0, 23.0, 27.0];
        let result = forecast(&series(2001, &values), ArimaOrder::default(), 5, 0.95).unwrap();
        let mut last_width = 0.0;
        for point in &result.points {
            assert!(point.lower <= point.mean && point.mean <= point.upper);
            let width = point.upper - point.lower;
            assert!(width >= last_width - 1e-9);
            last_width = width;
        }

        let narrow = forecast(&series(2001, &values), ArimaOrder::default(), 5, 0.8).unwrap();
        for (wide, narrow) in result.points.iter().zip(&narrow.points) {
            assert!(narrow.upper - narrow.lower <= wide.upper - wide.lower);
        }
    }

    #[test]
    fn pacf_mapping_is_stationary() {
        assert!((pacf_to_coefficients(&[0.3])[0] - 0.3_f64.tanh()).abs() < 1e-15);
        for (a, b) in [(3.0, -2.0), (-4.0, 4.0), (0.5, 0.5), (10.0, 10.0)] {
            let c = pacf_to_coefficients(&[a, b]);
            // AR(2) stationarity triangle
            assert!(c[1].abs() <= 1.0);
            assert!(c[0] + c[1] <= 1.0);
            assert!(c[1] - c[0] <= 1.0);
        }
    }

    #[test]
    fn forecasts_a_crime_column() {
        let mut rows = Vec::new();
        for (year, rape) in (2001..).zip([5, 5, 5, 5]) {
            rows.push(YearlyTotals {
                year,
                counts: CrimeCounts::new([rape, 1, 2, 3, 4, 9]),
            });
        }
        let aggregated = AggregatedSeries {
            state: "Bihar".to_string(),
            district: None,
            rows,
        };
        let result =
            forecast_crime(&aggregated, CrimeType::Rape, ArimaOrder::default(), 2, 0.95).unwrap();
        assert_eq!(result.points[0].year, 2005);
        assert!((result.points[1].mean - 5.0).abs() < 1e-9);
    }
}
