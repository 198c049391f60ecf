//! Hypergeometric enrichment of GO terms within a protein cluster
//!
//! For every term that at least one protein of the cluster carries, the
//! test asks how likely it is to draw that many (or more) proteins with the
//! term when drawing the cluster's proteins at random from the background.
//!
//! | Symbol | Meaning |
//! | --- | --- |
//! | `M` | annotated proteins in the background (population) |
//! | `m` | background proteins carrying the term (successes) |
//! | `N` | annotated proteins in the cluster (draws) |
//! | `x` | cluster proteins carrying the term (observed) |
//!
//! The p-value is the survival function `P(X >= x)`.
//!
//! # Examples
//!
//! ```
//! use gbsc_enrich::{AnnotationMap, GoTermId, ProteinId};
//! use gbsc_enrich::stats::hypergeom::Background;
//!
//! let mut annotations = AnnotationMap::new();
//! for i in 0..100 {
//!     let term = if i < 10 { 1u32 } else { 2u32 };
//!     annotations.add_annotation(format!("P{i}").into(), term.into());
//! }
//! let closed = annotations.assume_closed();
//! let background = Background::new(&closed);
//!
//! let cluster: Vec<ProteinId> = [0, 1, 2, 3, 50].iter().map(|i| ProteinId::from(format!("P{i}"))).collect();
//! let tests = background.test_cluster(&cluster).unwrap();
//!
//! let enriched = tests.iter().find(|t| t.term() == GoTermId::from(1u32)).unwrap();
//! assert_eq!(enriched.population(), 100);
//! assert_eq!(enriched.successes(), 10);
//! assert_eq!(enriched.draws(), 5);
//! assert_eq!(enriched.observed(), 4);
//! assert!(enriched.pvalue() < 0.001);
//! ```

use statrs::distribution::{DiscreteCDF, Hypergeometric};
use tracing::debug;

use crate::annotations::ClosedAnnotationMap;
use crate::stats::SampleSet;
use crate::{f64_from_u64, GoError, GoResult, GoTermId, ProteinId};

/// The result of the hypergeometric test of one term in one cluster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermTest {
    term: GoTermId,
    pvalue: f64,
    population: u64,
    successes: u64,
    draws: u64,
    observed: u64,
}

impl TermTest {
    /// The tested term
    pub fn term(&self) -> GoTermId {
        self.term
    }

    /// The probability to observe at least [`TermTest::observed`] proteins
    /// with the term by chance
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// `M`: the number of annotated proteins in the background
    pub fn population(&self) -> u64 {
        self.population
    }

    /// `m`: the number of background proteins carrying the term
    pub fn successes(&self) -> u64 {
        self.successes
    }

    /// `N`: the number of annotated proteins in the cluster
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// `x`: the number of cluster proteins carrying the term
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// The fold enrichment of the term in the cluster over the background
    pub fn fold_enrichment(&self) -> f64 {
        (f64_from_u64(self.observed) / f64_from_u64(self.draws))
            / (f64_from_u64(self.successes) / f64_from_u64(self.population))
    }
}

/// Calculates `P(X >= observed)` of the hypergeometric distribution
///
/// Observing nothing is always at least as likely as anything else,
/// so `observed == 0` returns `1.0`.
///
/// # Errors
///
/// [`GoError::InvalidInput`] if `successes` or `draws` exceed the `population`
///
/// # Examples
///
/// ```
/// use gbsc_enrich::stats::hypergeom::pvalue;
///
/// // 4 of 5 drawn proteins carry a term that 10 of 100 proteins carry
/// let p = pvalue(100, 10, 5, 4).unwrap();
/// assert!((p - 0.0002543847904672647).abs() < 1e-15);
///
/// assert_eq!(pvalue(100, 10, 5, 0).unwrap(), 1.0);
/// ```
pub fn pvalue(population: u64, successes: u64, draws: u64, observed: u64) -> GoResult<f64> {
    let hyper = Hypergeometric::new(population, successes, draws).map_err(|err| {
        GoError::InvalidInput(format!(
            "invalid hypergeometric parameters M={population} m={successes} N={draws}: {err}"
        ))
    })?;
    if observed == 0 {
        return Ok(1.0);
    }
    // subtracting 1, because we want to test including `observed`
    // e.g. "7 or more", but sf by default calculates "more than 7"
    Ok(hyper.sf(observed - 1).clamp(0.0, 1.0))
}

/// The annotated background for all enrichment tests of a run
///
/// The per-term counts of the background are calculated once and
/// shared by the tests of all clusters. The background is read-only,
/// so it can be used from many threads at the same time.
pub struct Background<'a> {
    annotations: &'a ClosedAnnotationMap,
    counts: SampleSet,
}

impl<'a> Background<'a> {
    /// Builds the background from all closed annotations
    pub fn new(annotations: &'a ClosedAnnotationMap) -> Self {
        let counts = SampleSet::new(annotations.iter().map(|(_, terms)| terms));
        debug!(
            "Background of {} annotated proteins and {} terms",
            counts.len(),
            counts.counts.len()
        );
        Self {
            annotations,
            counts,
        }
    }

    /// `M`: the number of annotated proteins
    pub fn population(&self) -> u64 {
        self.counts.len()
    }

    /// The number of proteins carrying the term
    pub fn successes(&self, term: &GoTermId) -> u64 {
        self.counts.get(term).unwrap_or_default()
    }

    /// The annotations backing this background
    pub fn annotations(&self) -> &ClosedAnnotationMap {
        self.annotations
    }

    /// Tests every term present in the cluster for enrichment
    ///
    /// Proteins that are unknown to the background or have no annotation
    /// are not part of the test, they neither count as draws nor as
    /// observations. Duplicate proteins are counted once.
    ///
    /// The results are sorted by term. A cluster without any annotated
    /// protein returns no results.
    ///
    /// # Errors
    ///
    /// [`GoError::InvalidInput`] if the cluster's counts are inconsistent
    /// with the background
    pub fn test_cluster(&self, proteins: &[ProteinId]) -> GoResult<Vec<TermTest>> {
        let mut seen = std::collections::HashSet::new();
        let members = proteins
            .iter()
            .filter(|protein| seen.insert(*protein))
            .filter_map(|protein| self.annotations.get(protein));
        let sample = SampleSet::new(members);
        if sample.is_empty() {
            return Ok(Vec::new());
        }

        let population = self.population();
        let draws = sample.len();
        let mut res = Vec::with_capacity(sample.counts.len());
        for (term, observed) in sample.sorted_counts() {
            let successes = self.counts.get(&term).ok_or(GoError::DoesNotExist)?;
            let pvalue = pvalue(population, successes, draws, observed)?;
            debug!(
                "Term:{}\tPopulation: {}, Successes: {}, Draws: {}, Observed: {}, p-value: {}",
                term, population, successes, draws, observed, pvalue
            );
            res.push(TermTest {
                term,
                pvalue,
                population,
                successes,
                draws,
                observed,
            });
        }
        Ok(res)
    }
}

/// Tests every term present in the cluster for enrichment against `background`
///
/// This builds the background counts for a single call. Use
/// [`Background::test_cluster`] to test many clusters against the same
/// background.
///
/// # Errors
///
/// See [`Background::test_cluster`]
pub fn test_cluster(
    cluster_proteins: &[ProteinId],
    background: &ClosedAnnotationMap,
) -> GoResult<Vec<TermTest>> {
    Background::new(background).test_cluster(cluster_proteins)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::AnnotationMap;

    /// 100 proteins, 10 of them annotated with term 1, all others with term 2
    fn background() -> ClosedAnnotationMap {
        let mut map = AnnotationMap::new();
        for i in 0..100 {
            let term = if i < 10 { 1u32 } else { 2u32 };
            map.add_annotation(format!("P{i}").into(), term.into());
        }
        map.add_protein("unannotated".into());
        map.assume_closed()
    }

    fn proteins(ids: &[&str]) -> Vec<ProteinId> {
        ids.iter().map(|id| ProteinId::from(*id)).collect()
    }

    #[test]
    fn reference_pvalue() {
        // scipy.stats.hypergeom.sf(3, 100, 10, 5)
        let expected = 0.0002543847904672647;
        let p = pvalue(100, 10, 5, 4).unwrap();
        assert!(((p - expected) / expected).abs() < 1e-10);
    }

    #[test]
    fn textbook_pvalues() {
        // Numbers calculated here https://statisticsbyjim.com/probability/hypergeometric-distribution/
        assert!((pvalue(50, 25, 13, 2).unwrap() - 0.9996189832542451).abs() < 1e-12);
        assert!((pvalue(50, 25, 13, 8).unwrap() - 0.26009737477738537).abs() < 1e-12);
        assert!((pvalue(50, 25, 13, 13).unwrap() - 0.000014654490222007184).abs() < 1e-15);
    }

    #[test]
    fn no_observation_is_certain() {
        assert!((pvalue(100, 10, 5, 0).unwrap() - 1.0).abs() < f64::EPSILON);
        assert!((pvalue(0, 0, 0, 0).unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn saturated_background_is_not_enriched() {
        // every protein carries the term and every protein is drawn:
        // observing all of them is certain
        assert!((pvalue(20, 20, 20, 20).unwrap() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exclusive_term_is_highly_enriched() {
        // the only 5 carriers of a term out of 10_000 are all drawn
        let p = pvalue(10_000, 5, 5, 5).unwrap();
        assert!(p > 0.0);
        assert!(p < 1e-15);
    }

    #[test]
    fn invalid_parameters() {
        assert!(pvalue(10, 11, 5, 1).is_err());
        assert!(pvalue(10, 5, 11, 1).is_err());
    }

    #[test]
    fn end_to_end_counts() {
        let background = background();
        let cluster = proteins(&["P0", "P1", "P2", "P3", "P50"]);
        let tests = test_cluster(&cluster, &background).unwrap();

        assert_eq!(tests.len(), 2);
        let enriched = tests[0];
        assert_eq!(enriched.term(), GoTermId::from(1u32));
        assert_eq!(enriched.population(), 100);
        assert_eq!(enriched.successes(), 10);
        assert_eq!(enriched.draws(), 5);
        assert_eq!(enriched.observed(), 4);
        assert!(((enriched.pvalue() - 0.0002543847904672647) / 0.0002543847904672647).abs() < 1e-10);
        assert!((enriched.fold_enrichment() - 8.0).abs() < 1e-12);

        let depleted = tests[1];
        assert_eq!(depleted.observed(), 1);
        assert!(depleted.pvalue() > 0.99);
    }

    #[test]
    fn unknown_and_unannotated_proteins_are_ignored() {
        let background = background();
        let cluster = proteins(&["P0", "P1", "unannotated", "missing", "P0"]);
        let tests = test_cluster(&cluster, &background).unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].draws(), 2);
        assert_eq!(tests[0].observed(), 2);
    }

    #[test]
    fn cluster_without_annotations() {
        let background = background();
        assert!(test_cluster(&proteins(&["unannotated", "missing"]), &background)
            .unwrap()
            .is_empty());
        assert!(test_cluster(&[], &background).unwrap().is_empty());
    }

    #[test]
    fn pvalues_are_probabilities() {
        let background = background();
        let background = Background::new(&background);
        for n in 1..30 {
            let cluster: Vec<ProteinId> = (0..n).map(|i| ProteinId::from(format!("P{}", i * 3))).collect();
            for test in background.test_cluster(&cluster).unwrap() {
                assert!((0.0..=1.0).contains(&test.pvalue()));
            }
        }
    }
}
