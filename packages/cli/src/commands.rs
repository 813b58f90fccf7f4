//! Subcommand implementations.
//!
//! Each command loads what it needs through the [`DatasetStore`], calls the
//! analytics core, and prints either a plain table or JSON. Analytics
//! failures that only mean "this selection cannot support that analysis"
//! become notices in the output instead of aborting the command.

use std::collections::BTreeMap;

use crime_pattern_analytics::{
    AnalyticsError, bootstrap_statistic, build_feature_matrix, build_similarity_graph,
    composition, correlation_matrix, crime_totals, forecast_crime, recommend_similar,
    top_districts_by_crime, welch_t_test,
};
use crime_pattern_analytics_models::{
    AnalysisConfig, BootstrapResult, CorrelationMatrix, CrimeShare, CrimeTotal, ForecastResult,
    RegionTotal, SimilarRegion, TTestResult,
};
use crime_pattern_crime_models::CrimeType;
use crime_pattern_dataset::normalize::{normalize_district, normalize_state};
use crime_pattern_dataset::{DatasetStore, aggregate};
use crime_pattern_dataset_models::{AggregatedSeries, Dataset, NewRecord, RegionKey};
use serde::Serialize;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// A region as typed by the user, canonicalized the way the loader does.
#[derive(Debug, Clone)]
pub struct Selection {
    pub state: String,
    pub district: Option<String>,
}

impl Selection {
    #[must_use]
    pub fn new(state: &str, district: Option<&str>) -> Self {
        Self {
            state: normalize_state(state),
            district: district
                .filter(|d| !d.trim().is_empty())
                .map(normalize_district),
        }
    }

    fn key(&self) -> RegionKey {
        RegionKey {
            state: self.state.clone(),
            district: self.district.clone(),
        }
    }

    fn series(&self, dataset: &Dataset) -> AggregatedSeries {
        aggregate(dataset, &self.state, self.district.as_deref())
    }
}

/// Keeps `Ok` values, turns data-shape failures into a notice, and passes
/// configuration errors through.
fn soften<T>(
    section: &str,
    result: Result<T, AnalyticsError>,
    notices: &mut Vec<String>,
) -> Result<Option<T>, AnalyticsError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e @ AnalyticsError::InvalidParameter { .. }) => Err(e),
        Err(e) => {
            log::warn!("{section} skipped: {e}");
            notices.push(format!("{section} unavailable: {e}"));
            Ok(None)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn states(store: &mut DatasetStore, json: bool) -> CommandResult {
    let states = store.dataset()?.states();
    if json {
        return print_json(&states);
    }
    for state in &states {
        println!("{state}");
    }
    Ok(())
}

pub fn districts(store: &mut DatasetStore, state: &str, json: bool) -> CommandResult {
    let state = normalize_state(state);
    let districts = store.dataset()?.districts(&state);
    if json {
        return print_json(&districts);
    }
    if districts.is_empty() {
        println!("No districts found for {state}");
    }
    for district in &districts {
        println!("{district}");
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeReport {
    region: RegionKey,
    crime: CrimeType,
    series: AggregatedSeries,
    totals: Vec<CrimeTotal>,
    composition: Vec<CrimeShare>,
    correlation: CorrelationMatrix,
    bootstrap: Option<BootstrapResult>,
    forecast: Option<ForecastResult>,
    similar: Option<Vec<SimilarRegion>>,
    top_districts: Option<Vec<RegionTotal>>,
    notices: Vec<String>,
}

pub fn analyze(
    store: &mut DatasetStore,
    config: &AnalysisConfig,
    selection: &Selection,
    crime: CrimeType,
    json: bool,
) -> CommandResult {
    let dataset = store.dataset()?;
    let series = selection.series(dataset);
    let mut notices = Vec::new();

    if series.is_empty() {
        notices.push(format!("No records found for {}", selection.key()));
    }

    let values = series.values(crime);
    let bootstrap = soften(
        "Confidence interval",
        bootstrap_statistic(&values, config.bootstrap.statistic, &config.bootstrap.params),
        &mut notices,
    )?;
    let forecast = soften(
        "Forecast",
        forecast_crime(
            &series,
            crime,
            config.forecast.order,
            config.forecast.steps,
            config.forecast.confidence,
        ),
        &mut notices,
    )?;

    let matrix = build_feature_matrix(dataset);
    let similar = match &selection.district {
        Some(_) => soften(
            "Similar regions",
            recommend_similar(&selection.key(), &matrix, config.similarity.top_n),
            &mut notices,
        )?,
        None => None,
    };
    let top_districts = similar.is_none().then(|| {
        top_districts_by_crime(&matrix, &selection.state, crime, config.similarity.top_n)
    });

    let report = AnalyzeReport {
        region: selection.key(),
        crime,
        totals: crime_totals(&series),
        composition: composition(&series),
        correlation: correlation_matrix(&series),
        series,
        bootstrap,
        forecast,
        similar,
        top_districts,
        notices,
    };

    if json {
        return print_json(&report);
    }
    print_report(&report, config);
    Ok(())
}

fn print_report(report: &AnalyzeReport, config: &AnalysisConfig) {
    println!("{} ({})", report.region, report.crime);
    println!();

    println!("{:<6} {:>10} {:>10}", "YEAR", "SELECTED", "TOTAL");
    for row in &report.series.rows {
        println!(
            "{:<6} {:>10} {:>10}",
            row.year,
            row.counts.get(report.crime),
            row.counts.total()
        );
    }
    println!();

    println!("{:<55} {:>10} {:>7}", "CRIME", "TOTAL", "SHARE");
    for share in &report.composition {
        println!(
            "{:<55} {:>10} {:>6.1}%",
            share.crime.column(),
            share.total,
            share.share * 100.0
        );
    }
    if let Some(top) = report.totals.first().filter(|t| t.total > 0) {
        println!("Most reported: {} ({})", top.crime, top.total);
    }
    println!();

    if let Some(ci) = &report.bootstrap {
        println!(
            "{} per year: {:.2} ({:.0}% CI {:.2} to {:.2}, {} resamples)",
            config.bootstrap.statistic,
            ci.estimate,
            ci.confidence * 100.0,
            ci.lower,
            ci.upper,
            ci.resamples
        );
        println!();
    }

    if let Some(forecast) = &report.forecast {
        println!("{} forecast:", forecast.order);
        println!("{:<6} {:>10} {:>10} {:>10}", "YEAR", "MEAN", "LOWER", "UPPER");
        for point in &forecast.points {
            println!(
                "{:<6} {:>10.1} {:>10.1} {:>10.1}",
                point.year, point.mean, point.lower, point.upper
            );
        }
        println!();
    }

    if let Some(similar) = &report.similar {
        println!("Similar regions:");
        for region in similar {
            println!("  {:<45} {:.3}", region.region.to_string(), region.score);
        }
        println!();
    }

    if let Some(top) = &report.top_districts {
        println!("Top districts in {} by {}:", report.region.state, report.crime);
        for district in top {
            println!("  {:<45} {:>10}", district.region.to_string(), district.total);
        }
        println!();
    }

    for notice in &report.notices {
        println!("Note: {notice}");
    }
}

pub fn similar(
    store: &mut DatasetStore,
    config: &AnalysisConfig,
    selection: &Selection,
    top_n: Option<usize>,
    json: bool,
) -> CommandResult {
    let matrix = build_feature_matrix(store.dataset()?);
    let top_n = top_n.unwrap_or(config.similarity.top_n);

    match recommend_similar(&selection.key(), &matrix, top_n) {
        Ok(similar) => {
            if json {
                return print_json(&similar);
            }
            for region in &similar {
                println!("{:<45} {:.3}", region.region.to_string(), region.score);
            }
        }
        Err(AnalyticsError::KeyNotFound { key }) => {
            let fallback = top_districts_by_crime(&matrix, &selection.state, config.crime, top_n);
            if json {
                return print_json(&fallback);
            }
            println!("{key} has no similarity profile; top districts by {}:", config.crime);
            for district in &fallback {
                println!("{:<45} {:>10}", district.region.to_string(), district.total);
            }
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn graph(
    store: &mut DatasetStore,
    config: &AnalysisConfig,
    threshold: Option<f64>,
    json: bool,
) -> CommandResult {
    let matrix = build_feature_matrix(store.dataset()?);
    let graph = build_similarity_graph(
        &matrix,
        threshold.unwrap_or(config.similarity.graph_threshold),
    );

    if json {
        return print_json(&graph);
    }

    println!(
        "{} regions, {} edges at similarity >= {}",
        graph.nodes.len(),
        graph.edges.len(),
        graph.threshold
    );
    for (i, component) in graph
        .components()
        .iter()
        .filter(|c| c.len() > 1)
        .enumerate()
    {
        println!();
        println!("Cluster {} ({} regions):", i + 1, component.len());
        for &node in component {
            println!("  {}", graph.nodes[node]);
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareReport {
    first: RegionKey,
    second: RegionKey,
    crime: CrimeType,
    test: TTestResult,
}

pub fn compare(
    store: &mut DatasetStore,
    first: &Selection,
    second: &Selection,
    crime: CrimeType,
    json: bool,
) -> CommandResult {
    let dataset = store.dataset()?;
    let a = first.series(dataset).values(crime);
    let b = second.series(dataset).values(crime);

    let test = match welch_t_test(&a, &b) {
        Ok(test) => test,
        Err(e) => {
            println!("Cannot compare {} and {}: {e}", first.key(), second.key());
            return Ok(());
        }
    };

    if json {
        return print_json(&CompareReport {
            first: first.key(),
            second: second.key(),
            crime,
            test,
        });
    }

    println!("{crime}: {} vs {}", first.key(), second.key());
    println!(
        "t = {:.3}, df = {:.1}, p = {:.4}",
        test.t_statistic, test.degrees_of_freedom, test.p_value
    );
    Ok(())
}

pub fn append(
    store: &mut DatasetStore,
    state: String,
    district: String,
    year: i32,
    counts: Vec<(String, u64)>,
    extra: Vec<(String, String)>,
    json: bool,
) -> CommandResult {
    let record = NewRecord {
        state,
        district,
        year,
        counts: counts.into_iter().collect::<BTreeMap<_, _>>(),
        extra: extra.into_iter().collect::<BTreeMap<_, _>>(),
    };

    let outcome = store.append(&record)?;

    if json {
        return print_json(&serde_json::json!({
            "state": outcome.state,
            "district": outcome.district,
            "rowCount": outcome.row_count,
            "addedColumns": outcome.added_columns,
        }));
    }

    println!(
        "Added {} / {} {year} ({} rows in {})",
        outcome.state,
        outcome.district,
        outcome.row_count,
        store.path().display()
    );
    if !outcome.added_columns.is_empty() {
        println!("New columns: {}", outcome.added_columns.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_canonicalized() {
        let selection = Selection::new("  bihar ", Some(" patna"));
        assert_eq!(selection.state, "Bihar");
        assert_eq!(selection.district.as_deref(), Some("Patna"));

        let whole = Selection::new("A&N Islands", Some("  "));
        assert_eq!(whole.district, None);
        assert_eq!(whole.key(), RegionKey::state_only(whole.state.clone()));
    }

    #[test]
    fn soften_keeps_parameter_errors() {
        let mut notices = Vec::new();

        let ok: Result<i32, AnalyticsError> = Ok(1);
        assert_eq!(soften("x", ok, &mut notices).unwrap(), Some(1));

        let short: Result<i32, AnalyticsError> = Err(AnalyticsError::InsufficientHistory {
            required: 3,
            actual: 1,
        });
        assert_eq!(soften("Forecast", short, &mut notices).unwrap(), None);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].starts_with("Forecast unavailable"));

        let bad: Result<i32, AnalyticsError> = Err(AnalyticsError::InvalidParameter {
            name: "p".to_string(),
            reason: "must be <= 5".to_string(),
        });
        assert!(soften("Forecast", bad, &mut notices).is_err());
        assert_eq!(notices.len(), 1);
    }
}
