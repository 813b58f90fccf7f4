//! Region feature vectors and cosine-similarity ranking.

use std::collections::BTreeMap;

use crime_pattern_analytics_models::{
    FeatureMatrix, RegionTotal, SimilarRegion, SimilarityEdge, SimilarityGraph,
};
use crime_pattern_crime_models::{CrimeCounts, CrimeType};
use crime_pattern_dataset_models::{Dataset, RegionKey};

use crate::AnalyticsError;

/// Sums every crime column per `(state, district)` over all years.
///
/// Rows are ordered by `(state, district)` and columns follow
/// [`CrimeType::all()`].
#[must_use]
pub fn build_feature_matrix(dataset: &Dataset) -> FeatureMatrix {
    let mut totals: BTreeMap<(&str, &str), CrimeCounts> = BTreeMap::new();
    for record in &dataset.records {
        *totals
            .entry((record.state.as_str(), record.district.as_str()))
            .or_default() += record.counts;
    }

    let (regions, rows) = totals
        .into_iter()
        .map(|((state, district), counts)| (RegionKey::new(state, district), counts.to_features()))
        .unzip();

    FeatureMatrix {
        regions,
        crime_types: CrimeType::all().to_vec(),
        rows,
    }
}

/// Cosine of the angle between `a` and `b`; 0 when either has zero
/// magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Pairwise cosine similarity between every pair of rows.
#[must_use]
pub fn similarity_matrix(matrix: &FeatureMatrix) -> Vec<Vec<f64>> {
    matrix
        .rows
        .iter()
        .map(|a| matrix.rows.iter().map(|b| cosine_similarity(a, b)).collect())
        .collect()
}

/// The `top_n` regions most similar to `key`, best first.
///
/// The query region is never included. Equal scores keep feature-matrix row
/// order.
///
/// # Errors
///
/// Returns [`AnalyticsError::KeyNotFound`] if `key` is not a row of
/// `matrix`. State-only keys never match.
pub fn recommend_similar(
    key: &RegionKey,
    matrix: &FeatureMatrix,
    top_n: usize,
) -> Result<Vec<SimilarRegion>, AnalyticsError> {
    let query = matrix
        .index_of(key)
        .ok_or_else(|| AnalyticsError::KeyNotFound {
            key: key.to_string(),
        })?;

    let target = &matrix.rows[query];
    let mut scored: Vec<(usize, f64)> = matrix
        .rows
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != query)
        .map(|(i, row)| (i, cosine_similarity(target, row)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(scored
        .into_iter()
        .take(top_n)
        .map(|(i, score)| SimilarRegion {
            region: matrix.regions[i].clone(),
            score,
        })
        .collect())
}

/// Links every pair of regions whose similarity is at least `threshold`.
#[must_use]
pub fn build_similarity_graph(matrix: &FeatureMatrix, threshold: f64) -> SimilarityGraph {
    let mut edges = Vec::new();
    for i in 0..matrix.len() {
        for j in (i + 1)..matrix.len() {
            let weight = cosine_similarity(&matrix.rows[i], &matrix.rows[j]);
            if weight >= threshold {
                edges.push(SimilarityEdge {
                    source: i,
                    target: j,
                    weight,
                });
            }
        }
    }

    log::debug!(
        "Similarity graph: {} node(s), {} edge(s) at threshold {threshold}",
        matrix.len(),
        edges.len()
    );

    SimilarityGraph {
        nodes: matrix.regions.clone(),
        threshold,
        edges,
    }
}

/// Districts of `state` ranked by their total for `crime`, highest first.
///
/// Used when a similarity query cannot be answered. Ties keep row order.
#[must_use]
pub fn top_districts_by_crime(
    matrix: &FeatureMatrix,
    state: &str,
    crime: CrimeType,
    n: usize,
) -> Vec<RegionTotal> {
    let mut totals: Vec<RegionTotal> = matrix
        .regions
        .iter()
        .enumerate()
        .filter(|(_, region)| region.state == state)
        .map(|(i, region)| RegionTotal {
            region: region.clone(),
            total: matrix.value(i, crime),
        })
        .collect();
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals.truncate(n);
    totals
}

#[cfg(test)]
mod tests {
    use crime_pattern_dataset_models::Record;

    use super::*;

    fn record(state: &str, district: &str, year: i32, counts: [u64; 6]) -> Record {
        Record {
            state: state.to_string(),
            district: district.to_string(),
            year,
            counts: CrimeCounts::new(counts),
        }
    }

    fn sample() -> Dataset {
        Dataset {
            records: vec![
                record("Bihar", "Patna", 2001, [10, 0, 0, 0, 0, 0]),
                record("Bihar", "Patna", 2002, [10, 0, 0, 0, 0, 0]),
                record("Bihar", "Gaya", 2001, [5, 0, 0, 0, 0, 0]),
                record("Assam", "Kamrup", 2001, [0, 4, 0, 0, 0, 0]),
                record("Assam", "Dhubri", 2001, [3, 3, 0, 0, 0, 0]),
                record("Kerala", "Wayanad", 2001, [0, 0, 0, 0, 0, 0]),
            ],
            rejected_rows: 0,
        }
    }

    #[test]
    fn feature_matrix_sums_across_years_sorted_by_region() {
        let matrix = build_feature_matrix(&sample());
        assert_eq!(
            matrix.regions,
            vec![
                RegionKey::new("Assam", "Dhubri"),
                RegionKey::new("Assam", "Kamrup"),
                RegionKey::new("Bihar", "Gaya"),
                RegionKey::new("Bihar", "Patna"),
                RegionKey::new("Kerala", "Wayanad"),
            ]
        );
        assert_eq!(matrix.crime_types.len(), CrimeType::COUNT);
        assert!((matrix.value(3, CrimeType::Rape) - 20.0).abs() < f64::EPSILON);
        assert!(matrix.rows.iter().all(|row| row.len() == CrimeType::COUNT));
    }

    #[test]
    fn cosine_of_self_is_one_and_zero_vector_is_zero() {
        let v = [1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
        assert!((cosine_similarity(&v, &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
        assert!(cosine_similarity(&v, &[0.0, 0.0, 0.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn similarity_matrix_is_symmetric() {
        let matrix = build_feature_matrix(&sample());
        let sims = similarity_matrix(&matrix);
        for i in 0..matrix.len() {
            for j in 0..matrix.len() {
                assert!((sims[i][j] - sims[j][i]).abs() < 1e-12);
            }
        }
        assert!((sims[2][3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn recommends_most_similar_excluding_query() {
        let matrix = build_feature_matrix(&sample());
        let key = RegionKey::new("Bihar", "Patna");
        let similar = recommend_similar(&key, &matrix, 5).unwrap();

        assert_eq!(similar.len(), 4);
        assert!(similar.iter().all(|s| s.region != key));
        assert_eq!(similar[0].region, RegionKey::new("Bihar", "Gaya"));
        assert!((similar[0].score - 1.0).abs() < 1e-12);
        assert!(similar.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn ties_keep_row_order() {
        let matrix = build_feature_matrix(&sample());
        let similar = recommend_similar(&RegionKey::new("Assam", "Kamrup"), &matrix, 4).unwrap();
        // Gaya, Patna and Wayanad all score 0 against Kamrup
        let districts: Vec<_> = similar
            .iter()
            .filter_map(|s| s.region.district.as_deref())
            .collect();
        assert_eq!(districts, vec!["Dhubri", "Gaya", "Patna", "Wayanad"]);
    }

    #[test]
    fn top_n_limits_results() {
        let matrix = build_feature_matrix(&sample());
        let key = RegionKey::new("Bihar", "Patna");
        assert_eq!(recommend_similar(&key, &matrix, 2).unwrap().len(), 2);
        assert!(recommend_similar(&key, &matrix, 0).unwrap().is_empty());
    }

    #[test]
    fn unknown_or_state_only_key_is_not_found() {
        let matrix = build_feature_matrix(&sample());
        for key in [RegionKey::new("Goa", "North Goa"), RegionKey::state_only("Bihar")] {
            match recommend_similar(&key, &matrix, 5) {
                Err(AnalyticsError::KeyNotFound { key: shown }) => {
                    assert_eq!(shown, key.to_string());
                }
                other => panic!("expected KeyNotFound, got {other:?}"),
            }
        }
    }

    #[test]
    fn graph_edges_respect_threshold() {
        let matrix = build_feature_matrix(&sample());
        let graph = build_similarity_graph(&matrix, 0.7);

        assert_eq!(graph.nodes.len(), matrix.len());
        assert!(graph.edges.iter().all(|e| e.source < e.target));
        assert!(graph.edges.iter().all(|e| e.weight >= 0.7));

        let sims = similarity_matrix(&matrix);
        for i in 0..matrix.len() {
            for j in (i + 1)..matrix.len() {
                let has_edge = graph.edges.iter().any(|e| e.source == i && e.target == j);
                assert_eq!(has_edge, sims[i][j] >= 0.7);
            }
        }

        // Dhubri (0) links Kamrup (1), Gaya (2) and Patna (3) at ~0.707;
        // Wayanad (4) has no magnitude and stays isolated
        assert_eq!(graph.components(), vec![vec![0, 1, 2, 3], vec![4]]);
    }

    #[test]
    fn top_districts_ranks_one_state() {
        let matrix = build_feature_matrix(&sample());
        let top = top_districts_by_crime(&matrix, "Bihar", CrimeType::Rape, 5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].region, RegionKey::new("Bihar", "Patna"));
        assert!((top[0].total - 20.0).abs() < f64::EPSILON);
        assert_eq!(top[1].region, RegionKey::new("Bihar", "Gaya"));

        assert_eq!(top_districts_by_crime(&matrix, "Bihar", CrimeType::Rape, 1).len(), 1);
        assert!(top_districts_by_crime(&matrix, "Goa", CrimeType::Rape, 5).is_empty());
    }
}
