//! Ranking of clusters by their s-measure
//!
//! The s-measure of a cluster is the fraction of its proteins that share
//! the best supported, significantly enriched term:
//!
//! ```text
//! s = x / cluster_size
//! ```
//!
//! The best supported term is the Benjamini-Hochberg significant term with
//! the most proteins in the cluster (`x`). Clusters without any significant
//! term, and clusters below the minimum size, are not ranked at all.
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::info;

use crate::ontology::OntologyService;
use crate::{f64_from_u64, EnrichmentResult, GoError, GoResult, GoTermId};

/// The representative term and s-measure of one cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterScore {
    cluster_id: String,
    term: GoTermId,
    observed: u64,
    cluster_size: u64,
    s_measure: f64,
}

impl ClusterScore {
    /// The ID of the cluster
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// The representative term of the cluster
    pub fn term(&self) -> GoTermId {
        self.term
    }

    /// Cluster proteins carrying the representative term
    pub fn observed(&self) -> u64 {
        self.observed
    }

    pub fn cluster_size(&self) -> u64 {
        self.cluster_size
    }

    /// The fraction of the cluster carrying the representative term,
    /// in `(0, 1]`
    pub fn s_measure(&self) -> f64 {
        self.s_measure
    }
}

/// Selects the representative term of every eligible cluster and sorts
/// the clusters by descending s-measure
///
/// A row is eligible if it is Benjamini-Hochberg significant and its
/// cluster has at least `min_cluster_size` proteins. Per cluster, the
/// eligible row with the largest `x` is the representative. Ties are
/// resolved by the order of `results`, both between rows of one cluster
/// and between clusters with the same s-measure: the first one wins.
///
/// # Examples
///
/// See the crate documentation
pub fn rank(results: &[EnrichmentResult], min_cluster_size: usize) -> Vec<ClusterScore> {
    let min_size = u64::try_from(min_cluster_size).unwrap_or(u64::MAX);
    let mut order: Vec<&str> = Vec::new();
    let mut best: HashMap<&str, &EnrichmentResult> = HashMap::new();

    for row in results
        .iter()
        .filter(|row| row.bh_significant() && row.cluster_size() >= min_size)
        .filter(|row| row.observed() > 0)
    {
        let replace = match best.get(row.cluster_id()) {
            None => {
                order.push(row.cluster_id());
                true
            }
            Some(current) => row.observed() > current.observed(),
        };
        if replace {
            best.insert(row.cluster_id(), row);
        }
    }

    let mut scores: Vec<ClusterScore> = order
        .iter()
        .filter_map(|cluster| best.get(cluster))
        .map(|row| ClusterScore {
            cluster_id: row.cluster_id().to_string(),
            term: row.term(),
            observed: row.observed(),
            cluster_size: row.cluster_size(),
            s_measure: f64_from_u64(row.observed()) / f64_from_u64(row.cluster_size()),
        })
        .collect();

    // stable, so clusters with equal scores keep their discovery order
    scores.sort_by(|a, b| b.s_measure.total_cmp(&a.s_measure));
    info!(
        "Ranked {} of {} clusters",
        scores.len(),
        results
            .iter()
            .map(EnrichmentResult::cluster_id)
            .collect::<HashSet<&str>>()
            .len()
    );
    scores
}

/// A [`ClusterScore`] with the name of its representative term
///
/// This is one row of the ranking report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCluster {
    cluster_id: String,
    cluster_size: u64,
    s_measure: f64,
    representative_go_id: GoTermId,
    representative_go_name: String,
}

impl RankedCluster {
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn cluster_size(&self) -> u64 {
        self.cluster_size
    }

    pub fn s_measure(&self) -> f64 {
        self.s_measure
    }

    /// The representative term
    pub fn term(&self) -> GoTermId {
        self.representative_go_id
    }

    /// The name of the representative term
    pub fn name(&self) -> &str {
        &self.representative_go_name
    }
}

/// Looks up the names of the representative terms
///
/// The order of `scores` is kept.
///
/// # Errors
///
/// - [`GoError::MissingTermName`] if `names` does not know a term. The
///   name table must contain every term that appears in the results.
/// - Any error of the [`OntologyService`]
pub fn resolve_names<S: OntologyService>(scores: &[ClusterScore], names: &S) -> GoResult<Vec<RankedCluster>> {
    scores
        .iter()
        .map(|score| {
            let name = names
                .resolve_name(score.term)?
                .ok_or(GoError::MissingTermName(score.term))?;
            Ok(RankedCluster {
                cluster_id: score.cluster_id.clone(),
                cluster_size: score.cluster_size,
                s_measure: score.s_measure,
                representative_go_id: score.term,
                representative_go_name: name,
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::GoTerm;
    use crate::{Aspect, TermTable};

    fn row(cluster: &str, term: u32, size: u64, observed: u64, significant: bool) -> EnrichmentResult {
        EnrichmentResult::fixture(cluster, term, size, observed, significant)
    }

    #[test]
    fn largest_x_is_representative() {
        let results = vec![
            row("a", 1, 10, 3, true),
            row("a", 2, 10, 7, true),
            row("a", 3, 10, 9, false),
            row("a", 4, 10, 7, true),
        ];
        let scores = rank(&results, 2);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].term(), GoTermId::from(2u32));
        assert_eq!(scores[0].observed(), 7);
        assert!((scores[0].s_measure() - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn sorted_descending() {
        let results = vec![
            row("low", 1, 10, 2, true),
            row("high", 1, 4, 4, true),
            row("mid", 1, 10, 5, true),
        ];
        let ids: Vec<String> = rank(&results, 2)
            .iter()
            .map(|score| score.cluster_id().to_string())
            .collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn ties_keep_discovery_order() {
        let results = vec![
            row("second", 5, 4, 2, true),
            row("first", 5, 10, 5, true),
            row("third", 5, 2, 1, true),
        ];
        for _ in 0..10 {
            let ids: Vec<String> = rank(&results, 2)
                .iter()
                .map(|score| score.cluster_id().to_string())
                .collect();
            assert_eq!(ids, vec!["second", "first", "third"]);
        }
    }

    #[test]
    fn ineligible_clusters_are_excluded() {
        let results = vec![
            row("insignificant", 1, 10, 8, false),
            row("single", 1, 1, 1, true),
            row("kept", 1, 3, 1, true),
        ];
        let scores = rank(&results, 2);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].cluster_id(), "kept");

        assert!(rank(&results, 4).is_empty());
        assert!(rank(&[], 2).is_empty());
    }

    #[test]
    fn s_measure_bounds() {
        let results: Vec<EnrichmentResult> = (1..=20)
            .map(|x| row(&format!("c{x}"), 1, 20, x, true))
            .collect();
        for score in rank(&results, 2) {
            assert!(score.s_measure() > 0.0);
            assert!(score.s_measure() <= 1.0);
        }
    }

    #[test]
    fn names_are_resolved() {
        let mut table = TermTable::default();
        table.insert_term(GoTerm::new(1u32.into(), Aspect::MolecularFunction, "kinase activity"));
        let scores = rank(&[row("a", 1, 4, 3, true)], 2);

        let ranked = resolve_names(&scores, &table).unwrap();
        assert_eq!(ranked[0].name(), "kinase activity");
        assert_eq!(ranked[0].cluster_size(), 4);
        assert!((ranked[0].s_measure() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_name_is_fatal() {
        let table = TermTable::default();
        let scores = rank(&[row("a", 42, 4, 3, true)], 2);
        assert!(matches!(
            resolve_names(&scores, &table),
            Err(GoError::MissingTermName(term)) if term == GoTermId::from(42u32)
        ));
    }
}
