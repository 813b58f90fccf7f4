//! Per-year aggregation for a selected region.

use std::collections::BTreeMap;

use crime_pattern_crime_models::CrimeCounts;
use crime_pattern_dataset_models::{AggregatedSeries, Dataset, YearlyTotals};

/// Sums every crime column per year for records matching `state` and,
/// when given and non-empty, `district`.
///
/// Names are matched exactly against the canonical forms produced by the
/// loader. An unmatched selection yields an empty series rather than an
/// error.
#[must_use]
pub fn aggregate(dataset: &Dataset, state: &str, district: Option<&str>) -> AggregatedSeries {
    let district = district.filter(|d| !d.is_empty());

    let mut by_year: BTreeMap<i32, CrimeCounts> = BTreeMap::new();
    for record in dataset
        .records
        .iter()
        .filter(|r| r.state == state)
        .filter(|r| district.is_none_or(|d| r.district == d))
    {
        *by_year.entry(record.year).or_default() += record.counts;
    }

    log::debug!(
        "Aggregated {} year(s) for {state}{}",
        by_year.len(),
        district.map(|d| format!(" / {d}")).unwrap_or_default()
    );

    AggregatedSeries {
        state: state.to_string(),
        district: district.map(str::to_owned),
        rows: by_year
            .into_iter()
            .map(|(year, counts)| YearlyTotals { year, counts })
            .collect(),
    }
}
