//! Appending user-submitted observations to the backing store.
//!
//! The store is rewritten in full on every append. The new contents are
//! written to a sibling `.tmp` file first and then renamed over the store,
//! so an interrupted write leaves the previous file intact. There is no
//! locking: two concurrent writers can still lose an update.

use std::path::{Path, PathBuf};

use crime_pattern_crime_models::CrimeType;
use crime_pattern_dataset_models::{
    DISTRICT_COLUMN, NewRecord, RawTable, STATE_COLUMN, YEAR_COLUMN, required_columns,
};

use crate::DatasetError;
use crate::loader::read_raw_file;
use crate::normalize::{is_total_district, normalize_district, normalize_state};

/// Earliest year accepted for a new observation.
const MIN_YEAR: i32 = 1900;

/// Latest year accepted for a new observation.
const MAX_YEAR: i32 = 9999;

/// Summary of a successful append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Canonical state written to the store.
    pub state: String,
    /// Canonical district written to the store.
    pub district: String,
    /// Number of data rows in the store after the append.
    pub row_count: usize,
    /// Columns added to the store header by this append.
    pub added_columns: Vec<String>,
}

/// Validates `record` and appends it to the store at `path`.
///
/// State and district are canonicalized with the loader's normalizer.
/// Store columns the record does not provide are filled with `0` for crime
/// columns and left empty otherwise; columns the record brings that the
/// store lacks are added to the header. A missing store file is created
/// with the canonical header.
///
/// # Errors
///
/// * [`DatasetError::SchemaMismatch`] if the record fails validation
/// * [`DatasetError::MissingColumn`] if the store lacks an identifier column
/// * [`DatasetError::WriteFailure`] if the store cannot be persisted
pub fn append_record(path: &Path, record: &NewRecord) -> Result<AppendOutcome, DatasetError> {
    validate(record)?;

    let mut table = if path.exists() {
        read_raw_file(path)?
    } else {
        log::info!("Store {} does not exist, creating it", path.display());
        RawTable {
            headers: required_columns().into_iter().map(str::to_owned).collect(),
            rows: Vec::new(),
        }
    };

    for column in [STATE_COLUMN, DISTRICT_COLUMN, YEAR_COLUMN] {
        if table.column_index(column).is_none() {
            return Err(DatasetError::MissingColumn {
                column: column.to_string(),
            });
        }
    }

    let added_columns = union_schema(&mut table, record);

    let state = normalize_state(&record.state);
    let district = normalize_district(&record.district);

    let row = table
        .headers
        .iter()
        .map(|header| match header.as_str() {
            STATE_COLUMN => state.clone(),
            DISTRICT_COLUMN => district.clone(),
            YEAR_COLUMN => record.year.to_string(),
            other if CrimeType::from_column(other).is_some() => record
                .counts
                .get(other)
                .copied()
                .unwrap_or(0)
                .to_string(),
            other => record.extra.get(other).cloned().unwrap_or_default(),
        })
        .collect();
    table.rows.push(row);

    write_atomic(path, &table)?;

    log::info!(
        "Appended {state} / {district} ({}) to {}; store now has {} rows",
        record.year,
        path.display(),
        table.rows.len()
    );

    Ok(AppendOutcome {
        state,
        district,
        row_count: table.rows.len(),
        added_columns,
    })
}

fn validate(record: &NewRecord) -> Result<(), DatasetError> {
    let mismatch = |message: String| Err(DatasetError::SchemaMismatch { message });

    if record.state.trim().is_empty() {
        return mismatch("state is required".to_string());
    }
    if record.district.trim().is_empty() {
        return mismatch("district is required".to_string());
    }
    if is_total_district(&record.district) {
        return mismatch("district may not be the aggregate 'Total' row".to_string());
    }
    if !(MIN_YEAR..=MAX_YEAR).contains(&record.year) {
        return mismatch(format!(
            "year {} is outside {MIN_YEAR}..={MAX_YEAR}",
            record.year
        ));
    }
    if let Some(unknown) = record
        .counts
        .keys()
        .find(|k| CrimeType::from_column(k).is_none())
    {
        return mismatch(format!("unknown crime column '{unknown}'"));
    }
    if let Some(reserved) = record
        .extra
        .keys()
        .find(|k| required_columns().contains(&k.as_str()))
    {
        return mismatch(format!(
            "extra field '{reserved}' collides with a required column"
        ));
    }
    Ok(())
}

/// Adds every crime column and every extra column of `record` missing from
/// the header, then pads all rows to the new width. Returns the added
/// column names.
fn union_schema(table: &mut RawTable, record: &NewRecord) -> Vec<String> {
    let mut added = Vec::new();

    let wanted = CrimeType::all()
        .iter()
        .map(|c| c.column().to_string())
        .chain(record.extra.keys().cloned());
    for column in wanted {
        if table.column_index(&column).is_none() {
            table.headers.push(column.clone());
            added.push(column);
        }
    }

    let fillers: Vec<&str> = table
        .headers
        .iter()
        .map(|h| {
            if CrimeType::from_column(h).is_some() {
                "0"
            } else {
                ""
            }
        })
        .collect();
    for row in &mut table.rows {
        while row.len() < fillers.len() {
            row.push(fillers[row.len()].to_string());
        }
    }

    if !added.is_empty() {
        log::info!("Extending store schema with: {}", added.join(", "));
    }
    added
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `table` to a temporary sibling of `path`, syncs it, and renames it
/// over `path`.
///
/// # Errors
///
/// Returns [`DatasetError::WriteFailure`] if any step fails. The temporary
/// file is removed on failure.
pub fn write_atomic(path: &Path, table: &RawTable) -> Result<(), DatasetError> {
    let tmp = tmp_path(path);

    let result = write_table(&tmp, table).and_then(|()| {
        std::fs::rename(&tmp, path).map_err(|e| DatasetError::WriteFailure {
            path: path.display().to_string(),
            source: e,
        })
    });

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn write_table(path: &Path, table: &RawTable) -> Result<(), DatasetError> {
    let failure = |e: std::io::Error| DatasetError::WriteFailure {
        path: path.display().to_string(),
        source: e,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(failure)?;
    }

    let file = std::fs::File::create(path).map_err(failure)?;
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);

    writer
        .write_record(&table.headers)
        .map_err(|e| failure(e.into()))?;
    for row in &table.rows {
        writer.write_record(row).map_err(|e| failure(e.into()))?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| failure(e.into_error()))?;
    file.sync_all().map_err(failure)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crime_pattern_dataset_models::Record;

    use super::*;
    use crate::loader::load;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("crime_pattern_append_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn seed_store(path: &Path) {
        std::fs::write(
            path,
            "STATE/UT,DISTRICT,Year,Rape,Kidnapping and Abduction,Dowry Deaths,\
             Assault on women with intent to outrage her modesty,\
             Insult to modesty of Women,Cruelty by Husband or his Relatives,Source\n\
             Bihar,Patna,2001,1,2,3,4,5,6,ncrb\n\
             Bihar,Gaya,2001,0,0,0,0,0,0,ncrb\n",
        )
        .unwrap();
    }

    fn new_record() -> NewRecord {
        NewRecord {
            state: " bihar ".to_string(),
            district: "PATNA".to_string(),
            year: 2002,
            counts: BTreeMap::from([("Rape".to_string(), 3), ("Dowry Deaths".to_string(), 1)]),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn append_then_reload_adds_exactly_one_row() {
        let dir = test_dir("reload");
        let store = dir.join("crime_data.csv");
        seed_store(&store);

        let before = load(&store).unwrap();
        let outcome = append_record(&store, &new_record()).unwrap();
        let after = load(&store).unwrap();

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(outcome.state, "Bihar");
        assert_eq!(outcome.district, "Patna");
        assert_eq!(outcome.row_count, 3);
        assert!(outcome.added_columns.is_empty());

        let added: &Record = after.records.last().unwrap();
        assert_eq!(added.state, "Bihar");
        assert_eq!(added.district, "Patna");
        assert_eq!(added.year, 2002);
        assert_eq!(added.counts.get(CrimeType::Rape), 3);
        assert_eq!(added.counts.get(CrimeType::DowryDeaths), 1);
        assert_eq!(added.counts.get(CrimeType::CrueltyByHusband), 0);

        assert!(!tmp_path(&store).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn preserves_extra_columns_and_extends_schema() {
        let dir = test_dir("schema");
        let store = dir.join("crime_data.csv");
        seed_store(&store);

        let mut record = new_record();
        record.extra.insert("Source".to_string(), "user".to_string());
        record.extra.insert("Notes".to_string(), "walk-in".to_string());
        let outcome = append_record(&store, &record).unwrap();
        assert_eq!(outcome.added_columns, vec!["Notes".to_string()]);

        let raw = read_raw_file(&store).unwrap();
        let source = raw.column_index("Source").unwrap();
        let notes = raw.column_index("Notes").unwrap();
        assert_eq!(raw.cell(0, source), "ncrb");
        assert_eq!(raw.cell(0, notes), "");
        assert_eq!(raw.cell(2, source), "user");
        assert_eq!(raw.cell(2, notes), "walk-in");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn fills_crime_columns_missing_from_store() {
        let dir = test_dir("union");
        let store = dir.join("crime_data.csv");
        std::fs::write(&store, "STATE/UT,DISTRICT,Year,Rape\nBihar,Patna,2001,4\n").unwrap();

        let outcome = append_record(&store, &new_record()).unwrap();
        assert_eq!(outcome.added_columns.len(), CrimeType::COUNT - 1);

        let dataset = load(&store).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records[0].counts.get(CrimeType::DowryDeaths), 0);
        assert_eq!(dataset.records[1].counts.get(CrimeType::DowryDeaths), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn creates_missing_store() {
        let dir = test_dir("create");
        let store = dir.join("crime_data.csv");

        append_record(&store, &new_record()).unwrap();
        let dataset = load(&store).unwrap();
        assert_eq!(dataset.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_invalid_records() {
        let dir = test_dir("invalid");
        let store = dir.join("crime_data.csv");
        seed_store(&store);

        let cases = [
            NewRecord {
                state: "  ".to_string(),
                ..new_record()
            },
            NewRecord {
                district: String::new(),
                ..new_record()
            },
            NewRecord {
                district: "Total".to_string(),
                ..new_record()
            },
            NewRecord {
                year: 12,
                ..new_record()
            },
            NewRecord {
                counts: BTreeMap::from([("rape".to_string(), 1)]),
                ..new_record()
            },
            NewRecord {
                extra: BTreeMap::from([("Year".to_string(), "2003".to_string())]),
                ..new_record()
            },
        ];
        for record in &cases {
            assert!(
                matches!(
                    append_record(&store, record),
                    Err(DatasetError::SchemaMismatch { .. })
                ),
                "{record:?} should be rejected"
            );
        }
        assert_eq!(load(&store).unwrap().len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_write_leaves_store_untouched() {
        let dir = test_dir("write_failure");
        let store = dir.join("crime_data.csv");
        seed_store(&store);
        let before = std::fs::read(&store).unwrap();

        // A directory in the way of the temporary file makes the write fail
        std::fs::create_dir_all(tmp_path(&store)).unwrap();

        match append_record(&store, &new_record()) {
            Err(DatasetError::WriteFailure { path, .. }) => {
                assert!(path.ends_with("crime_data.csv.tmp"), "{path}");
            }
            other => panic!("expected WriteFailure, got {other:?}"),
        }
        assert_eq!(std::fs::read(&store).unwrap(), before);
        assert_eq!(load(&store).unwrap().len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn store_without_identifier_column_is_rejected() {
        let dir = test_dir("missing");
        let store = dir.join("crime_data.csv");
        std::fs::write(&store, "STATE/UT,Year,Rape\nBihar,2001,4\n").unwrap();

        match append_record(&store, &new_record()) {
            Err(DatasetError::MissingColumn { column }) => assert_eq!(column, "DISTRICT"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
