//! Descriptive summaries of an aggregated series.

use crime_pattern_analytics_models::{CorrelationMatrix, CrimeShare, CrimeTotal};
use crime_pattern_crime_models::CrimeType;
use crime_pattern_dataset_models::AggregatedSeries;

/// Totals per crime type over every year of `series`, largest first.
/// Equal totals keep column order.
#[must_use]
pub fn crime_totals(series: &AggregatedSeries) -> Vec<CrimeTotal> {
    let mut totals: Vec<CrimeTotal> = series
        .totals()
        .iter()
        .map(|(crime, total)| CrimeTotal { crime, total })
        .collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals
}

/// Share of each crime type in the overall total, in column order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn composition(series: &AggregatedSeries) -> Vec<CrimeShare> {
    let totals = series.totals();
    let overall = totals.total();
    totals
        .iter()
        .map(|(crime, total)| CrimeShare {
            crime,
            total,
            share: if overall == 0 {
                0.0
            } else {
                total as f64 / overall as f64
            },
        })
        .collect()
}

/// Pearson correlation between every pair of crime columns across the
/// years of `series`.
#[must_use]
pub fn correlation_matrix(series: &AggregatedSeries) -> CorrelationMatrix {
    let crime_types = CrimeType::all().to_vec();
    let columns: Vec<Vec<f64>> = crime_types.iter().map(|c| series.values(*c)).collect();

    let values = columns
        .iter()
        .map(|a| columns.iter().map(|b| pearson(a, b)).collect())
        .collect();

    CorrelationMatrix {
        crime_types,
        values,
    }
}

/// `None` when there are fewer than two points or either side is constant.
#[allow(clippy::cast_precision_loss)]
fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() < 2 || a.len() != b.len() {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        covariance = dx.mul_add(dy, covariance);
        var_a = dx.mul_add(dx, var_a);
        var_b = dy.mul_add(dy, var_b);
    }

    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some((covariance / (var_a * var_b).sqrt()).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use crime_pattern_crime_models::CrimeCounts;
    use crime_pattern_dataset_models::YearlyTotals;

    use super::*;

    fn series(rows: &[[u64; 6]]) -> AggregatedSeries {
        AggregatedSeries {
            state: "Bihar".to_string(),
            district: None,
            rows: rows
                .iter()
                .zip(2001..)
                .map(|(counts, year)| YearlyTotals {
                    year,
                    counts: CrimeCounts::new(*counts),
                })
                .collect(),
        }
    }

    #[test]
    fn totals_sorted_descending_with_stable_ties() {
        let totals = crime_totals(&series(&[[1, 5, 0, 2, 0, 5], [1, 0, 0, 2, 0, 0]]));
        let order: Vec<CrimeType> = totals.iter().map(|t| t.crime).collect();
        assert_eq!(
            order,
            vec![
                CrimeType::KidnappingAndAbduction,
                CrimeType::CrueltyByHusband,
                CrimeType::AssaultOnWomen,
                CrimeType::Rape,
                CrimeType::DowryDeaths,
                CrimeType::InsultToModesty,
            ]
        );
        assert_eq!(totals[0].total, 5);
    }

    #[test]
    fn composition_shares_sum_to_one() {
        let shares = composition(&series(&[[1, 1, 2, 0, 0, 0], [0, 0, 0, 0, 0, 4]]));
        let sum: f64 = shares.iter().map(|s| s.share).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((shares[5].share - 0.5).abs() < 1e-12);
        assert_eq!(shares[5].crime, CrimeType::CrueltyByHusband);
    }

    #[test]
    fn composition_of_empty_series_is_zero() {
        let shares = composition(&series(&[]));
        assert_eq!(shares.len(), CrimeType::COUNT);
        assert!(shares.iter().all(|s| s.share == 0.0));
    }

    #[test]
    fn correlation_of_linear_columns() {
        let matrix = correlation_matrix(&series(&[
            [1, 2, 3, 7, 0, 1],
            [2, 4, 2, 7, 0, 5],
            [3, 6, 1, 7, 0, 2],
        ]));
        let rape = CrimeType::Rape.index();
        let kidnapping = CrimeType::KidnappingAndAbduction.index();
        let dowry = CrimeType::DowryDeaths.index();
        let assault = CrimeType::AssaultOnWomen.index();

        assert!((matrix.values[rape][kidnapping].unwrap() - 1.0).abs() < 1e-12);
        assert!((matrix.values[rape][dowry].unwrap() + 1.0).abs() < 1e-12);
        assert!((matrix.values[rape][rape].unwrap() - 1.0).abs() < 1e-12);
        // Constant column
        assert_eq!(matrix.values[rape][assault], None);
        assert_eq!(matrix.values[assault][assault], None);
    }

    #[test]
    fn correlation_needs_two_years() {
        let matrix = correlation_matrix(&series(&[[1, 2, 3, 4, 5, 6]]));
        assert!(matrix.values.iter().flatten().all(Option::is_none));
    }
}
