#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for exploring the state/district incidence dataset.
//!
//! Select a state (and optionally a district) to see its yearly series,
//! crime composition, a bootstrap confidence interval, an ARIMA forecast,
//! and the most similar districts. New observations can be appended to the
//! store from the command line.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crime_pattern_crime_models::CrimeType;
use crime_pattern_dataset::DatasetStore;

mod commands;
mod config;

use commands::Selection;

#[derive(Parser)]
#[command(name = "crime_pattern", about = "Crime pattern analysis for Indian states and districts")]
struct Cli {
    /// Path to a TOML config file (default: `crime_pattern.toml` in the project root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the CSV store (overrides `CRIME_PATTERN_DATA` and the config)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every state/UT in the dataset
    States,
    /// List the districts of a state
    Districts {
        /// State/UT name
        state: String,
    },
    /// Full analysis of one state or district
    Analyze {
        /// State/UT name
        #[arg(long)]
        state: String,
        /// District name (omit for the whole state)
        #[arg(long)]
        district: Option<String>,
        /// Crime column to analyze (defaults to the configured crime)
        #[arg(long, value_parser = parse_crime)]
        crime: Option<CrimeType>,
    },
    /// Districts with the most similar crime profile
    Similar {
        /// State/UT name
        #[arg(long)]
        state: String,
        /// District name
        #[arg(long)]
        district: String,
        /// Number of results (defaults to the configured `top_n`)
        #[arg(long)]
        top: Option<usize>,
    },
    /// Similarity graph and its clusters
    Graph {
        /// Minimum similarity for an edge (defaults to the configured threshold)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Welch t-test of one crime between two regions
    Compare {
        /// First state/UT
        #[arg(long)]
        state: String,
        /// First district (omit for the whole state)
        #[arg(long)]
        district: Option<String>,
        /// Second state/UT
        #[arg(long)]
        other_state: String,
        /// Second district (omit for the whole state)
        #[arg(long)]
        other_district: Option<String>,
        /// Crime column to compare (defaults to the configured crime)
        #[arg(long, value_parser = parse_crime)]
        crime: Option<CrimeType>,
    },
    /// Append a new observation to the store
    Append {
        /// State/UT name
        #[arg(long)]
        state: String,
        /// District name
        #[arg(long)]
        district: String,
        /// Observation year
        #[arg(long)]
        year: i32,
        /// Crime count as `COLUMN=N` (repeatable)
        #[arg(long = "count", value_parser = parse_count)]
        counts: Vec<(String, u64)>,
        /// Extra column value as `COLUMN=VALUE` (repeatable)
        #[arg(long = "extra", value_parser = parse_extra)]
        extra: Vec<(String, String)>,
    },
}

/// Accepts an exact column header or a case-insensitive match of one.
fn parse_crime(value: &str) -> Result<CrimeType, String> {
    let value = value.trim();
    CrimeType::from_column(value)
        .or_else(|| {
            CrimeType::all()
                .iter()
                .copied()
                .find(|c| c.column().eq_ignore_ascii_case(value))
        })
        .ok_or_else(|| {
            let known: Vec<&str> = CrimeType::all().iter().map(|c| c.column()).collect();
            format!("unknown crime type {value:?}, expected one of: {}", known.join(", "))
        })
}

fn split_pair(value: &str) -> Result<(String, String), String> {
    let (key, val) = value
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got {value:?}"))?;
    Ok((key.trim().to_string(), val.trim().to_string()))
}

fn parse_count(value: &str) -> Result<(String, u64), String> {
    let (column, count) = split_pair(value)?;
    let count = count
        .parse::<u64>()
        .map_err(|e| format!("invalid count for {column}: {e}"))?;
    Ok((column, count))
}

fn parse_extra(value: &str) -> Result<(String, String), String> {
    split_pair(value)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref())?;
    let store_path = config::store_path(&config, cli.data);
    log::debug!("Using store {}", store_path.display());
    let mut store = DatasetStore::new(store_path);
    let json = cli.json;

    match cli.command {
        Commands::States => commands::states(&mut store, json)?,
        Commands::Districts { state } => commands::districts(&mut store, &state, json)?,
        Commands::Analyze {
            state,
            district,
            crime,
        } => commands::analyze(
            &mut store,
            &config,
            &Selection::new(&state, district.as_deref()),
            crime.unwrap_or(config.crime),
            json,
        )?,
        Commands::Similar {
            state,
            district,
            top,
        } => commands::similar(
            &mut store,
            &config,
            &Selection::new(&state, Some(&district)),
            top,
            json,
        )?,
        Commands::Graph { threshold } => commands::graph(&mut store, &config, threshold, json)?,
        Commands::Compare {
            state,
            district,
            other_state,
            other_district,
            crime,
        } => commands::compare(
            &mut store,
            &Selection::new(&state, district.as_deref()),
            &Selection::new(&other_state, other_district.as_deref()),
            crime.unwrap_or(config.crime),
            json,
        )?,
        Commands::Append {
            state,
            district,
            year,
            counts,
            extra,
        } => commands::append(&mut store, state, district, year, counts, extra, json)?,
    }

    Ok(())
}
