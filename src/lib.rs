//! Gene Ontology enrichment of protein clusters
//!
//! `gbsc_enrich` tests every cluster of proteins for over-represented
//! [GO terms](`GoTermId`), corrects the p-values of each cluster for multiple
//! testing and ranks the clusters by their s-measure, the fraction of proteins
//! sharing the best supported significant term.
//!
//! The analysis runs in four stages:
//!
//! 1. [`closure::close`] adds the ancestors of every directly annotated term
//!    to each protein ([`ClosedAnnotationMap`])
//! 2. [`stats::hypergeom`] runs a hypergeometric test for every term present
//!    in a cluster against the whole annotated background
//! 3. [`stats::correction`] derives the Bonferroni threshold and the
//!    Benjamini-Hochberg adjusted p-values, per cluster
//! 4. [`ranking::rank`] picks one representative term per cluster and sorts
//!    clusters by their s-measure
//!
//! [`pipeline`] wires the stages to the files of a project directory.
//!
//! # Examples
//!
//! ```
//! use gbsc_enrich::{AnnotationMap, Cluster, ProteinId, TermGroup, GoTermId};
//! use gbsc_enrich::enrichment::analyse_cluster;
//! use gbsc_enrich::stats::hypergeom::Background;
//! use gbsc_enrich::ranking::rank;
//!
//! let kinase = GoTermId::try_from("GO:0016301").unwrap();
//! let binding = GoTermId::try_from("GO:0005488").unwrap();
//!
//! let mut annotations = AnnotationMap::new();
//! for i in 0..40 {
//!     let term = if i < 5 { kinase } else { binding };
//!     annotations.insert(ProteinId::from(format!("P{i:05}")), TermGroup::from(vec![term]));
//! }
//! let closed = annotations.assume_closed();
//! let background = Background::new(&closed);
//!
//! let cluster = Cluster::new("kinases", (0..4).map(|i| ProteinId::from(format!("P{i:05}"))));
//! let results = analyse_cluster(&cluster, &background, 0.05);
//! assert_eq!(results.len(), 1);
//! assert!(results[0].bh_significant());
//!
//! let ranking = rank(&results, 2);
//! assert_eq!(ranking[0].term(), kinase);
//! assert!((ranking[0].s_measure() - 1.0).abs() < f64::EPSILON);
//! ```
use core::fmt::Debug;
use std::num::ParseIntError;
use thiserror::Error;

pub mod annotations;
pub mod closure;
pub mod cluster;
pub mod config;
pub mod enrichment;
pub mod ontology;
pub mod parser;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod stats;
pub mod term;

pub use annotations::{AnnotationMap, ClosedAnnotationMap, ProteinId};
pub use cluster::Cluster;
pub use config::Config;
pub use enrichment::EnrichmentResult;
pub use ontology::{AncestorCache, OntologyService, TermTable};
pub use ranking::{ClusterScore, RankedCluster};
pub use term::{Aspect, GoTermId, TermGroup};

/// Most proteins carry fewer direct and inherited terms than this,
/// so their [`TermGroup`] stays on the stack
const DEFAULT_NUM_TERMS: usize = 30;
const MAX_GO_ID_INTEGER: u32 = 9_999_999;

/// Significance level used when none is configured
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Smallest cluster that is eligible for the s-measure ranking
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;

/// Bonferroni threshold reported for a cluster without any tested term.
/// No p-value can ever be below it.
pub const NO_CORRECTION_THRESHOLD: f64 = 100.0;

/// Attempts to resolve the ancestors of a single term before giving up
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Main Error type for this crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GoError {
    /// Failed to open a file
    #[error("unable to open file {0}")]
    CannotOpenFile(String),
    /// Malformed data in one of the inputs
    #[error("invalid input data: {0}")]
    InvalidInput(String),
    /// Failed to parse an integer part of an ID
    #[error("unable to parse Integer")]
    ParseIntError,
    /// A requested term or protein is not known
    #[error("term does not exist")]
    DoesNotExist,
    /// A required input artifact is missing
    #[error("required input {0} does not exist")]
    MissingInput(String),
    /// The cluster directory has no cluster files
    #[error("cluster directory {0} is empty")]
    EmptyClusterDirectory(String),
    /// A representative term has no entry in the GO name table
    #[error("no name found for {0}")]
    MissingTermName(GoTermId),
    /// The ontology service could not answer a request
    #[error("unable to resolve term: {0}")]
    Resolution(String),
    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<ParseIntError> for GoError {
    fn from(_: ParseIntError) -> Self {
        GoError::ParseIntError
    }
}

/// Shortcut for `Result<T, GoError>`
pub type GoResult<T> = Result<T, GoError>;

/// We have to frequently do divisions starting with counts
/// and need to return f64 values. Counts are bounded by the number
/// of proteins, far below `u32::MAX`, so the conversion is lossless.
fn f64_from_u64(n: u64) -> f64 {
    let intermediate: u32 = n.try_into().unwrap_or(u32::MAX);
    intermediate.into()
}

/// Same as [`f64_from_u64`] for `usize` counts
fn f64_from_usize(n: usize) -> f64 {
    let intermediate: u32 = n.try_into().unwrap_or(u32::MAX);
    intermediate.into()
}
