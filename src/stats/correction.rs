//! Multiple-testing correction of the p-values of one cluster
//!
//! Both corrections only ever see the terms tested within a single cluster.
//! They are independent of each other, a term can pass one of them and
//! fail the other.
//!
//! - Bonferroni: a term is significant if its raw p-value is below
//!   `alpha / K`, with `K` the number of terms tested in the cluster
//! - Benjamini-Hochberg: step-up procedure controlling the false discovery
//!   rate at `alpha`, yielding an adjusted p-value for every term

use crate::{f64_from_usize, GoTermId, NO_CORRECTION_THRESHOLD};

/// Returns the Bonferroni significance threshold for `tested` hypotheses
///
/// Without any hypothesis there is nothing to correct and
/// [`NO_CORRECTION_THRESHOLD`] is returned, a value no p-value can be below.
///
/// # Examples
///
/// ```
/// use gbsc_enrich::stats::correction::bonferroni_threshold;
///
/// assert!((bonferroni_threshold(0.05, 1) - 0.05).abs() < f64::EPSILON);
/// assert!((bonferroni_threshold(0.05, 10) - 0.005).abs() < f64::EPSILON);
/// assert_eq!(bonferroni_threshold(0.05, 0), 100.0);
/// ```
pub fn bonferroni_threshold(alpha: f64, tested: usize) -> f64 {
    if tested == 0 {
        NO_CORRECTION_THRESHOLD
    } else {
        alpha / f64_from_usize(tested)
    }
}

/// Benjamini-Hochberg adjusted p-values and rejections at level `alpha`
///
/// Returns one `(adjusted p-value, significant)` pair per input p-value,
/// in the order of the input. Equal p-values receive equal adjusted values.
///
/// Significance follows the step-up rule: with the p-values sorted
/// ascending, the largest rank `k` with `p(k) <= k / n * alpha` is found
/// and the `k` smallest p-values are significant.
///
/// # Examples
///
/// ```
/// use gbsc_enrich::stats::correction::benjamini_hochberg;
///
/// let adjusted = benjamini_hochberg(&[0.01, 0.04, 0.03, 0.005], 0.03);
/// assert!((adjusted[0].0 - 0.02).abs() < 1e-12);
/// assert!((adjusted[1].0 - 0.04).abs() < 1e-12);
/// assert_eq!(
///     adjusted.iter().map(|(_, sig)| *sig).collect::<Vec<bool>>(),
///     vec![true, false, false, true]
/// );
/// ```
pub fn benjamini_hochberg(pvalues: &[f64], alpha: f64) -> Vec<(f64, bool)> {
    let n = pvalues.len();
    if n == 0 {
        return Vec::new();
    }
    let total = f64_from_usize(n);

    // stable, so equal p-values keep their input order
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| pvalues[*a].total_cmp(&pvalues[*b]));

    let mut last_rejected = None;
    for (rank, idx) in order.iter().enumerate() {
        let factor = f64_from_usize(rank + 1) / total;
        if pvalues[*idx] <= factor * alpha {
            last_rejected = Some(rank);
        }
    }

    let mut res = vec![(1.0, false); n];
    let mut running_min = f64::INFINITY;
    for (rank, idx) in order.iter().enumerate().rev() {
        let factor = f64_from_usize(rank + 1) / total;
        running_min = running_min.min(pvalues[*idx] / factor);
        let significant = last_rejected.map_or(false, |last| rank <= last);
        res[*idx] = (running_min.min(1.0), significant);
    }
    res
}

/// Both corrections for a single term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjusted {
    term: GoTermId,
    pvalue: f64,
    bonferroni_significant: bool,
    bh_pvalue: f64,
    bh_significant: bool,
}

impl Adjusted {
    /// The corrected term
    pub fn term(&self) -> GoTermId {
        self.term
    }

    /// The raw p-value
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// `true` if the raw p-value is below the Bonferroni threshold
    pub fn bonferroni_significant(&self) -> bool {
        self.bonferroni_significant
    }

    /// The Benjamini-Hochberg adjusted p-value
    pub fn bh_pvalue(&self) -> f64 {
        self.bh_pvalue
    }

    /// `true` if the term is rejected by the Benjamini-Hochberg procedure
    pub fn bh_significant(&self) -> bool {
        self.bh_significant
    }
}

/// Multiple-testing correction of all terms tested in one cluster
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    bonferroni_threshold: f64,
    terms: Vec<Adjusted>,
}

impl Correction {
    /// The Bonferroni threshold of the cluster
    pub fn bonferroni_threshold(&self) -> f64 {
        self.bonferroni_threshold
    }

    /// The corrected terms, in input order
    pub fn terms(&self) -> &[Adjusted] {
        &self.terms
    }

    /// The correction of a single term
    pub fn get(&self, term: GoTermId) -> Option<&Adjusted> {
        self.terms.iter().find(|adjusted| adjusted.term == term)
    }

    /// The number of tested terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if no term was tested
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Applies Bonferroni and Benjamini-Hochberg corrections to the p-values
/// of all terms tested in one cluster
///
/// The number of hypotheses is the number of distinct terms in `pvalues`.
///
/// # Examples
///
/// ```
/// use gbsc_enrich::GoTermId;
/// use gbsc_enrich::stats::correction::correct;
///
/// let pvalues = vec![(GoTermId::from(1u32), 0.001), (GoTermId::from(2u32), 0.03)];
/// let correction = correct(&pvalues, 0.05);
///
/// assert!((correction.bonferroni_threshold() - 0.025).abs() < f64::EPSILON);
/// let first = correction.get(1u32.into()).unwrap();
/// assert!(first.bonferroni_significant());
/// assert!(first.bh_significant());
///
/// let second = correction.get(2u32.into()).unwrap();
/// assert!(!second.bonferroni_significant());
/// assert!(second.bh_significant());
/// ```
pub fn correct(pvalues: &[(GoTermId, f64)], alpha: f64) -> Correction {
    let mut distinct: Vec<GoTermId> = pvalues.iter().map(|(term, _)| *term).collect();
    distinct.sort_unstable();
    distinct.dedup();
    let threshold = bonferroni_threshold(alpha, distinct.len());

    let raw: Vec<f64> = pvalues.iter().map(|(_, pvalue)| *pvalue).collect();
    let terms = pvalues
        .iter()
        .zip(benjamini_hochberg(&raw, alpha))
        .map(|((term, pvalue), (bh_pvalue, bh_significant))| Adjusted {
            term: *term,
            pvalue: *pvalue,
            bonferroni_significant: *pvalue < threshold,
            bh_pvalue,
            bh_significant,
        })
        .collect();

    Correction {
        bonferroni_threshold: threshold,
        terms,
    }
}
