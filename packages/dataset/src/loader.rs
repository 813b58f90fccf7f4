//! CSV reader and cleaning pipeline for the incidence store.
//!
//! [`read_raw`] parses the store into an untyped [`RawTable`] (headers
//! trimmed, cells untouched) so the append path can rewrite the file
//! without losing unknown columns. [`clean`] turns a raw table into a
//! [`Dataset`].

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crime_pattern_crime_models::{CrimeCounts, CrimeType};
use crime_pattern_dataset_models::{
    DISTRICT_COLUMN, Dataset, RawTable, Record, STATE_COLUMN, YEAR_COLUMN,
};

use crate::DatasetError;
use crate::normalize::{is_total_district, normalize_district, normalize_state};

/// Parses CSV from `reader` into a [`RawTable`].
///
/// # Errors
///
/// Returns [`DatasetError::Csv`] if the input is not valid CSV.
pub fn read_raw<R: Read>(reader: R) -> Result<RawTable, DatasetError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_owned).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Reads the store at `path` into a [`RawTable`].
///
/// # Errors
///
/// Returns [`DatasetError::Io`] if the file cannot be opened, or
/// [`DatasetError::Csv`] if it cannot be parsed.
pub fn read_raw_file(path: &Path) -> Result<RawTable, DatasetError> {
    let file = std::fs::File::open(path).map_err(|e| DatasetError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    read_raw(std::io::BufReader::new(file))
}

/// Reads and cleans the store at `path`.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be read or lacks a required
/// column.
pub fn load(path: &Path) -> Result<Dataset, DatasetError> {
    let raw = read_raw_file(path)?;
    log::info!("Read {} rows from {}", raw.rows.len(), path.display());
    clean(&raw)
}

/// Column positions of every required header.
struct ColumnIndex {
    state: usize,
    district: usize,
    year: usize,
    crimes: Vec<(CrimeType, usize)>,
}

impl ColumnIndex {
    fn resolve(raw: &RawTable) -> Result<Self, DatasetError> {
        let find = |column: &str| {
            raw.column_index(column)
                .ok_or_else(|| DatasetError::MissingColumn {
                    column: column.to_string(),
                })
        };

        let state = find(STATE_COLUMN)?;
        let district = find(DISTRICT_COLUMN)?;
        let year = find(YEAR_COLUMN)?;
        let crimes = CrimeType::all()
            .iter()
            .map(|crime| find(crime.column()).map(|idx| (*crime, idx)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            state,
            district,
            year,
            crimes,
        })
    }
}

/// Cleans a raw table into a [`Dataset`].
///
/// Rows with a district of `Total` are dropped, names are normalized, counts
/// are coerced to non-negative integers, and exact duplicates are removed
/// keeping the first occurrence. Duplicates are detected on the normalized
/// [`Record`], so extra columns outside the required set do not take part:
/// two rows that differ only there collapse into one. Rows whose year
/// cannot be parsed are rejected with a warning and counted in
/// [`Dataset::rejected_rows`].
///
/// # Errors
///
/// Returns [`DatasetError::MissingColumn`] naming the first required column
/// absent from the header.
pub fn clean(raw: &RawTable) -> Result<Dataset, DatasetError> {
    let columns = ColumnIndex::resolve(raw)?;

    let mut records = Vec::with_capacity(raw.rows.len());
    let mut seen = HashSet::with_capacity(raw.rows.len());
    let mut rejected_rows = 0;
    let mut total_rows = 0;
    let mut duplicates = 0;

    for row in 0..raw.rows.len() {
        let district = raw.cell(row, columns.district);
        if is_total_district(district) {
            total_rows += 1;
            continue;
        }

        let year_cell = raw.cell(row, columns.year);
        let Some(year) = parse_year(year_cell) else {
            // +2: one for the header, one for 1-based line numbers
            log::warn!(
                "Rejecting line {}: unparseable year {year_cell:?}",
                row + 2
            );
            rejected_rows += 1;
            continue;
        };

        let mut counts = CrimeCounts::default();
        for (crime, idx) in &columns.crimes {
            counts.set(*crime, parse_count(raw.cell(row, *idx)));
        }

        let record = Record {
            state: normalize_state(raw.cell(row, columns.state)),
            district: normalize_district(district),
            year,
            counts,
        };

        if seen.insert(record.clone()) {
            records.push(record);
        } else {
            duplicates += 1;
        }
    }

    log::info!(
        "Cleaned dataset: {} records ({total_rows} total rows dropped, \
         {duplicates} duplicates dropped, {rejected_rows} rejected)",
        records.len()
    );

    Ok(Dataset {
        records,
        rejected_rows,
    })
}

/// Parses a year cell. Integer-valued decimals such as `2001.0` are
/// accepted.
fn parse_year(cell: &str) -> Option<i32> {
    let cell = cell.trim();
    if let Ok(year) = cell.parse::<i32>() {
        return Some(year);
    }
    let value = cell.parse::<f64>().ok()?;
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(value as i32)
}

/// Parses a count cell. Missing, unparseable, and negative values become
/// zero; finite decimals are truncated.
fn parse_count(cell: &str) -> u64 {
    let cell = cell.trim();
    if let Ok(count) = cell.parse::<u64>() {
        return count;
    }
    match cell.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(value) if value.is_finite() && value > 0.0 => value as u64,
        _ => 0,
    }
}
