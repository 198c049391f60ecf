//! Enrichment analysis of whole clusters
//!
//! Each cluster is tested on its own against the shared [`Background`]
//! and its p-values are corrected within the cluster. Clusters do not
//! depend on each other, so [`analyse_clusters`] runs them in parallel.
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::stats::correction::{correct, Adjusted};
use crate::stats::hypergeom::{Background, TermTest};
use crate::{Cluster, GoError, GoResult, GoTermId};

/// One row of the enrichment report: the test of one term in one cluster
///
/// The serialized field names are the column headers of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    cluster_id: String,
    go_id: GoTermId,
    pvalue: f64,
    #[serde(rename = "M")]
    population: u64,
    #[serde(rename = "m")]
    successes: u64,
    #[serde(rename = "N")]
    draws: u64,
    #[serde(rename = "x")]
    observed: u64,
    bonferroni_threshold: f64,
    #[serde(rename = "bonferroni_pass", deserialize_with = "lenient_bool")]
    bonferroni_significant: bool,
    bh_pvalue: f64,
    #[serde(rename = "bh_pass", deserialize_with = "lenient_bool")]
    bh_significant: bool,
}

impl EnrichmentResult {
    /// Combines the test of a term with its corrections
    pub fn new(cluster_id: &str, test: &TermTest, bonferroni_threshold: f64, adjusted: &Adjusted) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            go_id: test.term(),
            pvalue: test.pvalue(),
            population: test.population(),
            successes: test.successes(),
            draws: test.draws(),
            observed: test.observed(),
            bonferroni_threshold,
            bonferroni_significant: adjusted.bonferroni_significant(),
            bh_pvalue: adjusted.bh_pvalue(),
            bh_significant: adjusted.bh_significant(),
        }
    }

    /// The ID of the cluster
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// The tested term
    pub fn term(&self) -> GoTermId {
        self.go_id
    }

    /// The raw hypergeometric p-value
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// `M`: annotated proteins in the background
    pub fn population(&self) -> u64 {
        self.population
    }

    /// `m`: background proteins carrying the term
    pub fn successes(&self) -> u64 {
        self.successes
    }

    /// `N`: annotated proteins in the cluster
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// `x`: cluster proteins carrying the term
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// The size of the cluster as used by the s-measure
    ///
    /// This is the number of annotated proteins of the cluster, `N`.
    pub fn cluster_size(&self) -> u64 {
        self.draws
    }

    /// The Bonferroni threshold of the cluster
    pub fn bonferroni_threshold(&self) -> f64 {
        self.bonferroni_threshold
    }

    pub fn bonferroni_significant(&self) -> bool {
        self.bonferroni_significant
    }

    /// The Benjamini-Hochberg adjusted p-value
    pub fn bh_pvalue(&self) -> f64 {
        self.bh_pvalue
    }

    pub fn bh_significant(&self) -> bool {
        self.bh_significant
    }
}

/// Accepts `true`/`false` in any case, as written by other tools
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = String::deserialize(deserializer)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid boolean {other}"))),
    }
}

/// Tests and corrects all terms of one cluster
///
/// # Errors
///
/// [`GoError::InvalidInput`] if the cluster's counts are inconsistent
/// with the background
pub fn try_analyse_cluster(
    cluster: &Cluster,
    background: &Background,
    alpha: f64,
) -> GoResult<Vec<EnrichmentResult>> {
    let tests = background.test_cluster(cluster.proteins())?;
    if tests.is_empty() {
        info!("No GO for cluster {}", cluster.name());
        return Ok(Vec::new());
    }

    let pvalues: Vec<(GoTermId, f64)> = tests.iter().map(|test| (test.term(), test.pvalue())).collect();
    let correction = correct(&pvalues, alpha);
    debug!(
        "Cluster {}: {} terms tested, Bonferroni threshold {}",
        cluster.name(),
        tests.len(),
        correction.bonferroni_threshold()
    );

    Ok(tests
        .iter()
        .zip(correction.terms())
        .map(|(test, adjusted)| {
            EnrichmentResult::new(cluster.name(), test, correction.bonferroni_threshold(), adjusted)
        })
        .collect())
}

/// Tests and corrects all terms of one cluster
///
/// A cluster that fails is logged and yields no results, so that a single
/// broken cluster never aborts the analysis of all others.
///
/// The results are sorted by term.
pub fn analyse_cluster(cluster: &Cluster, background: &Background, alpha: f64) -> Vec<EnrichmentResult> {
    match try_analyse_cluster(cluster, background, alpha) {
        Ok(results) => results,
        Err(err) => {
            warn!("Enrichment of cluster {} failed: {}", cluster.name(), err);
            Vec::new()
        }
    }
}

/// Analyses all clusters in parallel
///
/// `workers` sets the number of threads, `None` uses the default
/// [`rayon`] pool. The results are returned in the order of `clusters`,
/// identical to a sequential run.
///
/// # Errors
///
/// [`GoError::InvalidConfig`] if the thread pool cannot be created
pub fn analyse_clusters(
    clusters: &[Cluster],
    background: &Background,
    alpha: f64,
    workers: Option<usize>,
) -> GoResult<Vec<EnrichmentResult>> {
    let run = || -> Vec<EnrichmentResult> {
        clusters
            .par_iter()
            .map(|cluster| analyse_cluster(cluster, background, alpha))
            .collect::<Vec<Vec<EnrichmentResult>>>()
            .into_iter()
            .flatten()
            .collect()
    };

    let results = match workers {
        Some(threads) => ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|err| GoError::InvalidConfig(format!("unable to start {threads} workers: {err}")))?
            .install(run),
        None => run(),
    };
    info!(
        "Tested {} clusters, {} cluster-term pairs",
        clusters.len(),
        results.len()
    );
    Ok(results)
}

#[cfg(test)]
impl EnrichmentResult {
    pub(crate) fn fixture(cluster_id: &str, term: u32, cluster_size: u64, observed: u64, bh_significant: bool) -> Self {
        Self {
            cluster_id: cluster_id.to_string(),
            go_id: term.into(),
            pvalue: 0.001,
            population: 1000,
            successes: 50,
            draws: cluster_size,
            observed,
            bonferroni_threshold: 0.05,
            bonferroni_significant: bh_significant,
            bh_pvalue: 0.002,
            bh_significant,
        }
    }
}
