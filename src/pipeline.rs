//! Running a complete analysis on a project directory
//!
//! A project directory holds the GO data of one analysis:
//!
//! | File | Content | Required |
//! |---|---|---|
//! | `go_names.csv` | `go_id`, `name`, `aspect` of every term | yes |
//! | `go_annotations.json` | protein to terms, see [`crate::parser::annotation_json`] | yes, unless given explicitly |
//! | `go_ancestors.tsv` | `go_id`, `ancestor_id` pairs | no |
//!
//! Direct annotations are restricted to the analysed aspect, whatever
//! their source. Terms without an entry in `go_names.csv` are kept.
//!
//! The analysis writes `enrichment_results.tsv`, `clusters_s_values.tsv`
//! and the closed annotations `go_annotations_closed.json` into the
//! project directory.
//!
//! All inputs are checked before any computation starts.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::annotations::AnnotationMap;
use crate::closure::close;
use crate::cluster::{cluster_files, read_cluster_dir};
use crate::enrichment::analyse_clusters;
use crate::ontology::Retrying;
use crate::parser::{annotation_json, enrichment_report, protein_list, quickgo, term_table};
use crate::ranking::{rank, resolve_names};
use crate::report::{write_enrichment, write_ranking};
use crate::stats::hypergeom::Background;
use crate::{AncestorCache, Cluster, Config, GoError, GoResult, ProteinId, TermTable};

/// File name of the GO name table
pub const GO_NAMES_FILE: &str = "go_names.csv";
/// File name of the protein annotations
pub const GO_ANNOTATIONS_FILE: &str = "go_annotations.json";
/// File name of the optional ancestor table
pub const GO_ANCESTORS_FILE: &str = "go_ancestors.tsv";
/// File name of the closed annotations written by a run
pub const CLOSED_ANNOTATIONS_FILE: &str = "go_annotations_closed.json";
/// File name of the enrichment report
pub const ENRICHMENT_RESULTS_FILE: &str = "enrichment_results.tsv";
/// File name of the ranking report
pub const RANKING_FILE: &str = "clusters_s_values.tsv";

/// The input locations of an analysis
#[derive(Debug, Clone)]
pub struct Project {
    dir: PathBuf,
    clusters: PathBuf,
    annotations: Option<PathBuf>,
    proteins: Option<PathBuf>,
}

impl Project {
    /// A project in `dir` analysing the clusters in `clusters`
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(dir: P, clusters: Q) -> Self {
        Self {
            dir: dir.into(),
            clusters: clusters.into(),
            annotations: None,
            proteins: None,
        }
    }

    /// Uses an annotation file other than `go_annotations.json`
    ///
    /// Files ending in `.json` are read as annotation JSON, all others
    /// as QuickGO TSV.
    pub fn with_annotations<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.annotations = Some(path.into());
        self
    }

    /// Adds every protein listed in `path` to the annotations
    ///
    /// Listed proteins without any annotation are part of the written
    /// closed annotations, but do not count towards the background.
    pub fn with_proteins<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.proteins = Some(path.into());
        self
    }

    /// The project directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The cluster directory
    pub fn clusters(&self) -> &Path {
        &self.clusters
    }

    /// The annotation file
    pub fn annotations(&self) -> PathBuf {
        self.annotations
            .clone()
            .unwrap_or_else(|| self.dir.join(GO_ANNOTATIONS_FILE))
    }

    /// The additional protein list, if any
    pub fn proteins(&self) -> Option<&Path> {
        self.proteins.as_deref()
    }

    /// The GO name table
    pub fn names(&self) -> PathBuf {
        self.dir.join(GO_NAMES_FILE)
    }

    /// The ancestor table, if the project has one
    pub fn ancestors(&self) -> Option<PathBuf> {
        Some(self.dir.join(GO_ANCESTORS_FILE)).filter(|path| path.is_file())
    }

    /// Path of the enrichment report
    pub fn enrichment_report(&self) -> PathBuf {
        self.dir.join(ENRICHMENT_RESULTS_FILE)
    }

    /// Path of the ranking report
    pub fn ranking_report(&self) -> PathBuf {
        self.dir.join(RANKING_FILE)
    }

    /// Checks that all required inputs exist
    ///
    /// # Errors
    ///
    /// - [`GoError::MissingInput`] naming the first missing input
    /// - [`GoError::EmptyClusterDirectory`] if there are no cluster files
    pub fn check(&self) -> GoResult<()> {
        if !self.dir.is_dir() {
            return Err(GoError::MissingInput(self.dir.display().to_string()));
        }
        if !self.clusters.is_dir() {
            return Err(GoError::MissingInput(self.clusters.display().to_string()));
        }
        if cluster_files(&self.clusters)?.is_empty() {
            return Err(GoError::EmptyClusterDirectory(
                self.clusters.display().to_string(),
            ));
        }
        let required = [Some(self.names()), Some(self.annotations()), self.proteins.clone()];
        for file in required.into_iter().flatten() {
            if !file.is_file() {
                return Err(GoError::MissingInput(file.display().to_string()));
            }
        }
        Ok(())
    }
}

/// Overview of a finished analysis
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Number of cluster files
    pub clusters: usize,
    /// Number of clusters with at least one tested term
    pub tested_clusters: usize,
    /// Number of rows of the enrichment report
    pub results: usize,
    /// Number of rows of the ranking report
    pub ranked: usize,
    pub enrichment_report: PathBuf,
    pub ranking_report: PathBuf,
}

fn load_annotations(
    project: &Project,
    config: &Config,
    clusters: &[Cluster],
    table: &TermTable,
) -> GoResult<AnnotationMap> {
    let path = project.annotations();
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    let mut annotations = if is_json {
        if !config.exclude_evidence_codes.is_empty() {
            warn!(
                "{} has no evidence codes, excluded evidence codes are ignored",
                path.display()
            );
        }
        let mut annotations = annotation_json::read(&path)?;
        let removed = annotations
            .retain_terms(|term| table.aspect(term).map_or(true, |aspect| aspect == config.aspect));
        if removed > 0 {
            info!("Removed {} annotations outside of {}", removed, config.aspect);
        }
        annotations
    } else {
        let proteins: Vec<ProteinId> = clusters
            .iter()
            .flat_map(|cluster| cluster.proteins().iter().cloned())
            .collect::<HashSet<ProteinId>>()
            .into_iter()
            .collect();
        quickgo::annotations(&path, config.aspect, &config.exclude_evidence_codes, &proteins)?
    };
    if let Some(list) = project.proteins() {
        for protein in protein_list(list)? {
            annotations.add_protein(protein);
        }
    }
    Ok(annotations)
}

/// Runs the whole analysis of `project`
///
/// 1. checks the configuration and all inputs
/// 2. loads clusters, GO names, ancestors and annotations
/// 3. closes the annotations over their ancestors
/// 4. tests and corrects every cluster
/// 5. ranks the clusters and resolves the names of their representatives
/// 6. writes the enrichment and the ranking report
///
/// Neither report is written if a name cannot be resolved.
///
/// # Errors
///
/// - [`GoError::InvalidConfig`] if the configuration is invalid
/// - [`GoError::MissingInput`] or [`GoError::EmptyClusterDirectory`]
///   if an input is missing
/// - [`GoError::MissingTermName`] if a representative term has no name
/// - Errors of parsing the inputs or writing the reports
pub fn run(project: &Project, config: &Config) -> GoResult<Summary> {
    config.validate()?;
    project.check()?;

    let clusters = read_cluster_dir(project.clusters())?;
    let table = term_table::load(project.names(), project.ancestors())?;
    let annotations = load_annotations(project, config, &clusters, &table)?;
    info!(
        "Loaded {} clusters, {} GO names, ancestors of {} terms and annotations of {} proteins",
        clusters.len(),
        table.len(),
        table.ancestor_len(),
        annotations.len()
    );

    let service = Retrying::new(table, config.max_attempts);
    let cache = AncestorCache::new();
    let closed = close(annotations, &cache, &service, config.aspect);
    annotation_json::write(&closed, project.dir().join(CLOSED_ANNOTATIONS_FILE))?;

    let background = Background::new(&closed);
    let results = analyse_clusters(&clusters, &background, config.alpha, config.workers)?;
    let scores = rank(&results, config.min_cluster_size);
    let ranked = resolve_names(&scores, service.inner())?;

    write_enrichment(&results, project.enrichment_report())?;
    write_ranking(&ranked, project.ranking_report())?;

    let tested_clusters = results
        .iter()
        .map(|row| row.cluster_id())
        .collect::<HashSet<&str>>()
        .len();
    Ok(Summary {
        clusters: clusters.len(),
        tested_clusters,
        results: results.len(),
        ranked: ranked.len(),
        enrichment_report: project.enrichment_report(),
        ranking_report: project.ranking_report(),
    })
}

/// Ranks the clusters of a saved enrichment report
///
/// Returns the number of ranked clusters.
///
/// # Errors
///
/// - [`GoError::MissingInput`] if the report or the name table is missing
/// - [`GoError::MissingTermName`] if a representative term has no name
/// - Errors of parsing the inputs or writing the report
pub fn rank_report<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
    report: P,
    names: Q,
    output: R,
    min_cluster_size: usize,
) -> GoResult<usize> {
    for file in [report.as_ref(), names.as_ref()] {
        if !file.is_file() {
            return Err(GoError::MissingInput(file.display().to_string()));
        }
    }
    let results = enrichment_report::read(report)?;
    let table = term_table::load(names, None::<&Path>)?;
    let ranked = resolve_names(&rank(&results, min_cluster_size), &table)?;
    write_ranking(&ranked, output)?;
    Ok(ranked.len())
}
