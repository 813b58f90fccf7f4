#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record, region, and aggregated series types for the incidence dataset.
//!
//! A [`Dataset`] is the cleaned, in-memory view of the backing store. It is
//! passed explicitly into every analysis call; nothing in the workspace
//! holds a global table.

use std::collections::{BTreeMap, BTreeSet};

use crime_pattern_crime_models::{CrimeCounts, CrimeType};
use serde::{Deserialize, Serialize};

/// Header of the state/UT identifier column.
pub const STATE_COLUMN: &str = "STATE/UT";

/// Header of the district identifier column.
pub const DISTRICT_COLUMN: &str = "DISTRICT";

/// Header of the year column.
pub const YEAR_COLUMN: &str = "Year";

/// Headers every store must carry, in canonical order.
#[must_use]
pub fn required_columns() -> Vec<&'static str> {
    let mut columns = vec![STATE_COLUMN, DISTRICT_COLUMN, YEAR_COLUMN];
    columns.extend(CrimeType::all().iter().map(|c| c.column()));
    columns
}

/// Untyped tabular rows as read from (or written to) the backing store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Column headers, trimmed.
    pub headers: Vec<String>,
    /// Row cells, one `Vec` per row. Rows may be shorter than `headers`.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Returns the position of `column` in the header row.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Returns the cell at (`row`, `column`), or `""` when the row is short.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map_or("", String::as_str)
    }
}

/// A region: a state alone, or a (state, district) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionKey {
    /// Canonical state/UT name.
    pub state: String,
    /// Canonical district name, `None` for a whole state.
    pub district: Option<String>,
}

impl RegionKey {
    /// Creates a (state, district) region.
    #[must_use]
    pub fn new(state: impl Into<String>, district: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            district: Some(district.into()),
        }
    }

    /// Creates a whole-state region.
    #[must_use]
    pub fn state_only(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            district: None,
        }
    }
}

impl std::fmt::Display for RegionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.district {
            Some(district) => write!(f, "{} / {district}", self.state),
            None => write!(f, "{}", self.state),
        }
    }
}

/// One cleaned observation: a district's counts for one year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Canonical state/UT name.
    pub state: String,
    /// Canonical district name. Never `Total`.
    pub district: String,
    /// Observation year.
    pub year: i32,
    /// Incident counts per crime type.
    pub counts: CrimeCounts,
}

impl Record {
    /// The region this record belongs to.
    #[must_use]
    pub fn region(&self) -> RegionKey {
        RegionKey::new(self.state.clone(), self.district.clone())
    }
}

/// The cleaned dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    /// Cleaned, deduplicated records in store order.
    pub records: Vec<Record>,
    /// Rows rejected by the loader (unparseable year).
    pub rejected_rows: usize,
}

impl Dataset {
    /// Sorted distinct state names.
    #[must_use]
    pub fn states(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.state.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted distinct district names within `state`.
    #[must_use]
    pub fn districts(&self, state: &str) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.state == state)
            .map(|r| r.district.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Re-emits the records in store format (required columns only).
    #[must_use]
    pub fn to_raw_table(&self) -> RawTable {
        let headers = required_columns().into_iter().map(str::to_owned).collect();
        let rows = self
            .records
            .iter()
            .map(|r| {
                let mut row = vec![r.state.clone(), r.district.clone(), r.year.to_string()];
                row.extend(r.counts.iter().map(|(_, count)| count.to_string()));
                row
            })
            .collect();
        RawTable { headers, rows }
    }
}

/// Summed counts for one year of an aggregated selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyTotals {
    /// Year.
    pub year: i32,
    /// Summed counts across all matching records for that year.
    pub counts: CrimeCounts,
}

/// A single numeric observation indexed by year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearValue {
    /// Year.
    pub year: i32,
    /// Observed value.
    pub value: f64,
}

/// Per-year totals for a selected region, ascending by year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSeries {
    /// Selected state.
    pub state: String,
    /// Selected district, if any.
    pub district: Option<String>,
    /// One row per distinct year, strictly ascending.
    pub rows: Vec<YearlyTotals>,
}

impl AggregatedSeries {
    /// The selection this series was built for.
    #[must_use]
    pub fn region(&self) -> RegionKey {
        RegionKey {
            state: self.state.clone(),
            district: self.district.clone(),
        }
    }

    /// Whether no records matched the selection.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of years present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Years present, ascending.
    #[must_use]
    pub fn years(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.year).collect()
    }

    /// One crime column as a year-indexed numeric series.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn series(&self, crime: CrimeType) -> Vec<YearValue> {
        self.rows
            .iter()
            .map(|r| YearValue {
                year: r.year,
                value: r.counts.get(crime) as f64,
            })
            .collect()
    }

    /// One crime column as plain values, ascending by year.
    #[must_use]
    pub fn values(&self, crime: CrimeType) -> Vec<f64> {
        self.series(crime).into_iter().map(|p| p.value).collect()
    }

    /// Sum of every row.
    #[must_use]
    pub fn totals(&self) -> CrimeCounts {
        self.rows
            .iter()
            .fold(CrimeCounts::default(), |acc, r| acc + r.counts)
    }
}

/// A user-submitted observation, before validation.
///
/// `counts` is keyed by crime column header; `extra` carries any other
/// columns the store may hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    /// State/UT name as entered.
    pub state: String,
    /// District name as entered.
    pub district: String,
    /// Observation year.
    pub year: i32,
    /// Incident counts keyed by crime column header.
    #[serde(default)]
    pub counts: BTreeMap<String, u64>,
    /// Values for non-core columns.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}
