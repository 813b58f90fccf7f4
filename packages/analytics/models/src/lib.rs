#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result, parameter, and configuration types for the analysis pipeline.
//!
//! These are the structured values the presentation layer renders: bootstrap
//! intervals, forecasts, similarity rankings and graphs, and descriptive
//! summaries of an aggregated series.

use std::collections::VecDeque;
use std::path::PathBuf;

use crime_pattern_crime_models::CrimeType;
use crime_pattern_dataset_models::RegionKey;
use serde::{Deserialize, Serialize};

// ── Bootstrap ────────────────────────────────────────────────────────────

/// A named statistic that can be bootstrapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    /// Arithmetic mean.
    #[default]
    Mean,
    /// Median (average of the two middle values for even lengths).
    Median,
    /// Population standard deviation (`ddof = 0`).
    StdDev,
    /// Sum.
    Sum,
}

impl Statistic {
    /// Evaluates the statistic. Returns `NaN` for an empty slice, except
    /// [`Statistic::Sum`] which returns `0.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            Self::Sum => values.iter().sum(),
            Self::Mean => {
                if values.is_empty() {
                    f64::NAN
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
            Self::Median => {
                if values.is_empty() {
                    return f64::NAN;
                }
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len().is_multiple_of(2) {
                    f64::midpoint(sorted[mid - 1], sorted[mid])
                } else {
                    sorted[mid]
                }
            }
            Self::StdDev => {
                let mean = Self::Mean.apply(values);
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                    / values.len() as f64;
                var.sqrt()
            }
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::Median => write!(f, "median"),
            Self::StdDev => write!(f, "std_dev"),
            Self::Sum => write!(f, "sum"),
        }
    }
}

/// Parameters for a bootstrap confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapParams {
    /// Number of resamples to draw.
    pub resamples: usize,
    /// Confidence level in `(0, 1)`.
    pub confidence: f64,
    /// RNG seed. A fixed seed reproduces identical bounds.
    pub seed: u64,
}

impl Default for BootstrapParams {
    fn default() -> Self {
        Self {
            resamples: 2000,
            confidence: 0.95,
            seed: 0,
        }
    }
}

/// A bootstrap percentile confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapResult {
    /// The statistic evaluated on the observed values.
    pub estimate: f64,
    /// Lower percentile bound.
    pub lower: f64,
    /// Upper percentile bound.
    pub upper: f64,
    /// Confidence level used.
    pub confidence: f64,
    /// Number of resamples drawn.
    pub resamples: usize,
}

// ── Forecast ─────────────────────────────────────────────────────────────

/// ARIMA model orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 3]", into = "[usize; 3]")]
pub struct ArimaOrder {
    /// Autoregressive order.
    pub p: usize,
    /// Differencing order.
    pub d: usize,
    /// Moving-average order.
    pub q: usize,
}

impl ArimaOrder {
    /// Creates an order triple.
    #[must_use]
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl From<[usize; 3]> for ArimaOrder {
    fn from([p, d, q]: [usize; 3]) -> Self {
        Self { p, d, q }
    }
}

impl From<ArimaOrder> for [usize; 3] {
    fn from(order: ArimaOrder) -> Self {
        [order.p, order.d, order.q]
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Summary of a fitted ARIMA model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FittedArima {
    /// Autoregressive coefficients `phi_1..phi_p`.
    pub ar: Vec<f64>,
    /// Moving-average coefficients `theta_1..theta_q`.
    pub ma: Vec<f64>,
    /// Mean of the differenced series (only estimated when `d == 0`).
    pub mean: f64,
    /// Innovation variance.
    pub sigma2: f64,
    /// Conditional sum of squared residuals at the optimum.
    pub css: f64,
    /// Number of residuals the fit was scored on.
    pub observations: usize,
}

/// One forecast horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    /// Forecast year.
    pub year: i32,
    /// Point forecast.
    pub mean: f64,
    /// Lower interval bound.
    pub lower: f64,
    /// Upper interval bound.
    pub upper: f64,
}

/// Point and interval forecasts beyond the last observed year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    /// Model orders.
    pub order: ArimaOrder,
    /// Interval confidence level.
    pub confidence: f64,
    /// One entry per future year, ascending.
    pub points: Vec<ForecastPoint>,
    /// The fitted model.
    pub model: FittedArima,
}

// ── Similarity ───────────────────────────────────────────────────────────

/// Region × crime-type totals, one row per (state, district).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureMatrix {
    /// Row index, sorted by (state, district).
    pub regions: Vec<RegionKey>,
    /// Column order.
    pub crime_types: Vec<CrimeType>,
    /// Row-major totals, `rows[i][j]` for region `i` and crime `j`.
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Position of `key` in the row index.
    #[must_use]
    pub fn index_of(&self, key: &RegionKey) -> Option<usize> {
        self.regions.iter().position(|r| r == key)
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the matrix has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Value of `crime` for row `row`, or `0.0` when out of range.
    #[must_use]
    pub fn value(&self, row: usize, crime: CrimeType) -> f64 {
        self.crime_types
            .iter()
            .position(|c| *c == crime)
            .and_then(|col| self.rows.get(row).and_then(|r| r.get(col)))
            .copied()
            .unwrap_or(0.0)
    }
}

/// A region ranked by similarity to a query region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarRegion {
    /// The similar region.
    pub region: RegionKey,
    /// Cosine similarity to the query.
    pub score: f64,
}

/// A region ranked by a single crime total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionTotal {
    /// The region.
    pub region: RegionKey,
    /// Total across all years for the selected crime.
    pub total: f64,
}

/// An undirected weighted edge between two graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityEdge {
    /// Index of the first node (always less than `target`).
    pub source: usize,
    /// Index of the second node.
    pub target: usize,
    /// Cosine similarity of the two regions.
    pub weight: f64,
}

/// Regions linked when their similarity reaches a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityGraph {
    /// One node per region, in feature-matrix order.
    pub nodes: Vec<RegionKey>,
    /// Edge threshold used.
    pub threshold: f64,
    /// Edges, ordered by `(source, target)`.
    pub edges: Vec<SimilarityEdge>,
}

impl SimilarityGraph {
    /// Neighbors of node `node` with edge weights, in ascending node order.
    #[must_use]
    pub fn neighbors(&self, node: usize) -> Vec<(usize, f64)> {
        let mut out: Vec<(usize, f64)> = self
            .edges
            .iter()
            .filter_map(|e| {
                if e.source == node {
                    Some((e.target, e.weight))
                } else if e.target == node {
                    Some((e.source, e.weight))
                } else {
                    None
                }
            })
            .collect();
        out.sort_by_key(|(n, _)| *n);
        out
    }

    /// Connected components as lists of node indices. Components are
    /// ordered by their smallest node and nodes within a component are
    /// ascending.
    #[must_use]
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            adjacency[edge.source].push(edge.target);
            adjacency[edge.target].push(edge.source);
        }

        let mut seen = vec![false; self.nodes.len()];
        let mut components = Vec::new();
        for start in 0..self.nodes.len() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                for &next in &adjacency[node] {
                    if !seen[next] {
                        seen[next] = true;
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }
}

// ── Hypothesis tests and distribution fits ───────────────────────────────

/// Result of Welch's unequal-variance two-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TTestResult {
    /// t statistic (`mean(a) - mean(b)` over its standard error).
    pub t_statistic: f64,
    /// Welch–Satterthwaite degrees of freedom.
    pub degrees_of_freedom: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

/// Poisson fit of a count series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoissonFit {
    /// Rate estimate (sample mean).
    pub lambda: f64,
    /// Population variance of the counts.
    pub variance: f64,
    /// `variance / lambda`; 1 for an ideal Poisson process, `NaN` when
    /// `lambda` is 0.
    pub dispersion_index: f64,
}

/// Normal fit of a numeric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalFit {
    /// Sample mean.
    pub mean: f64,
    /// Sample standard deviation (`ddof = 1`).
    pub std_dev: f64,
}

// ── Descriptive summaries ────────────────────────────────────────────────

/// Total count of one crime type over a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeTotal {
    /// Crime type.
    pub crime: CrimeType,
    /// Total across all years.
    pub total: u64,
}

/// Share of one crime type in a selection's total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeShare {
    /// Crime type.
    pub crime: CrimeType,
    /// Total across all years.
    pub total: u64,
    /// Fraction of the overall total in `[0, 1]`; 0 when the overall total
    /// is 0.
    pub share: f64,
}

/// Pearson correlation between crime columns across years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMatrix {
    /// Row and column order.
    pub crime_types: Vec<CrimeType>,
    /// `values[i][j]`; `None` where either column has zero variance.
    pub values: Vec<Vec<Option<f64>>>,
}

// ── Configuration ────────────────────────────────────────────────────────

/// Bootstrap settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Resampling parameters.
    #[serde(flatten)]
    pub params: BootstrapParams,
    /// Statistic to bootstrap.
    pub statistic: Statistic,
}

/// Forecast settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Model orders, `[p, d, q]`.
    pub order: ArimaOrder,
    /// Number of future years.
    pub steps: usize,
    /// Interval confidence level.
    pub confidence: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            order: ArimaOrder::default(),
            steps: 5,
            confidence: 0.95,
        }
    }
}

/// Similarity settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Number of similar regions to return.
    pub top_n: usize,
    /// Minimum similarity for a graph edge.
    pub graph_threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            graph_threshold: 0.7,
        }
    }
}

/// Analysis configuration, loadable from TOML. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Store path. Falls back to the default data directory when unset.
    pub data_path: Option<PathBuf>,
    /// Crime type used for single-series analysis.
    pub crime: CrimeType,
    /// Bootstrap settings.
    pub bootstrap: BootstrapConfig,
    /// Forecast settings.
    pub forecast: ForecastConfig,
    /// Similarity settings.
    pub similarity: SimilarityConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            crime: CrimeType::Rape,
            bootstrap: BootstrapConfig::default(),
            forecast: ForecastConfig::default(),
            similarity: SimilarityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_on_small_input() {
        let values = [1.0, 2.0, 3.0, 10.0];
        assert!((Statistic::Mean.apply(&values) - 4.0).abs() < 1e-12);
        assert!((Statistic::Median.apply(&values) - 2.5).abs() < 1e-12);
        assert!((Statistic::Sum.apply(&values) - 16.0).abs() < 1e-12);
        assert!((Statistic::StdDev.apply(&values) - 12.5_f64.sqrt()).abs() < 1e-12);
        assert!((Statistic::Median.apply(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
        assert!(Statistic::Mean.apply(&[]).is_nan());
    }

    #[test]
    fn config_defaults_fill_missing_keys() {
        let config: AnalysisConfig = toml::from_str(
            r#"
            crime = "Dowry Deaths"

            [bootstrap]
            resamples = 500
            statistic = "median"

            [forecast]
            order = [2, 0, 1]
            "#,
        )
        .unwrap();

        assert_eq!(config.crime, CrimeType::DowryDeaths);
        assert_eq!(config.bootstrap.params.resamples, 500);
        assert!((config.bootstrap.params.confidence - 0.95).abs() < f64::EPSILON);
        assert_eq!(config.bootstrap.statistic, Statistic::Median);
        assert_eq!(config.forecast.order, ArimaOrder::new(2, 0, 1));
        assert_eq!(config.forecast.steps, 5);
        assert_eq!(config.similarity.top_n, 5);
        assert!(config.data_path.is_none());
    }

    #[test]
    fn empty_config_is_default() {
        let config: AnalysisConfig = toml::from_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn graph_components_and_neighbors() {
        let graph = SimilarityGraph {
            nodes: (0..5)
                .map(|i| RegionKey::new("S", format!("D{i}")))
                .collect(),
            threshold: 0.5,
            edges: vec![
                SimilarityEdge {
                    source: 0,
                    target: 3,
                    weight: 0.9,
                },
                SimilarityEdge {
                    source: 1,
                    target: 2,
                    weight: 0.6,
                },
                SimilarityEdge {
                    source: 2,
                    target: 3,
                    weight: 0.7,
                },
            ],
        };
        assert_eq!(graph.components(), vec![vec![0, 1, 2, 3], vec![4]]);
        assert_eq!(graph.neighbors(3), vec![(0, 0.9), (2, 0.7)]);
        assert!(graph.neighbors(4).is_empty());
    }

    #[test]
    fn feature_matrix_lookup() {
        let matrix = FeatureMatrix {
            regions: vec![RegionKey::new("Bihar", "Gaya"), RegionKey::new("Bihar", "Patna")],
            crime_types: CrimeType::all().to_vec(),
            rows: vec![vec![1.0; 6], vec![2.0, 0.0, 0.0, 0.0, 0.0, 5.0]],
        };
        assert_eq!(matrix.index_of(&RegionKey::new("Bihar", "Patna")), Some(1));
        assert_eq!(matrix.index_of(&RegionKey::state_only("Bihar")), None);
        assert!((matrix.value(1, CrimeType::CrueltyByHusband) - 5.0).abs() < f64::EPSILON);
    }
}
