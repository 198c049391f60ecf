//! Named sets of proteins
//!
//! Clusters are read from a directory with one file per cluster. The file
//! name is the cluster ID. A file is either in FASTA format, in which case
//! only the headers are used, or a plain list with one accession per line.
//!
//! ```text
//! >sp|P04637|P53_HUMAN Cellular tumor antigen p53
//! MEEPQSDPSVEPPLSQETFSDLWKLLPENNVLSPLPSQAMDDLMLSPDDIEQWFTEDPGP
//! >tr|A0A024R161|A0A024R161_HUMAN Guanine nucleotide-binding protein
//! MGSRASTLLRDEELEEIKKETGFSHSQITRLYSRFTSLDKGENGTLSREDFQRIPELAIN
//! ```
//!
//! Clusters may overlap. A protein can be part of many clusters.
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{GoError, GoResult, ProteinId};

/// A named set of proteins
///
/// Every protein appears only once. The order in which the proteins
/// were added is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    name: String,
    proteins: Vec<ProteinId>,
}

impl Cluster {
    /// Constructs a new [`Cluster`], dropping duplicate proteins
    pub fn new<I: IntoIterator<Item = ProteinId>>(name: &str, proteins: I) -> Self {
        let mut seen = HashSet::new();
        let proteins = proteins
            .into_iter()
            .filter(|protein| seen.insert(protein.clone()))
            .collect();
        Self {
            name: name.to_string(),
            proteins,
        }
    }

    /// The ID of the cluster
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The proteins of the cluster
    pub fn proteins(&self) -> &[ProteinId] {
        &self.proteins
    }

    /// The number of distinct proteins
    pub fn len(&self) -> usize {
        self.proteins.len()
    }

    /// Returns `true` if the cluster has no proteins
    pub fn is_empty(&self) -> bool {
        self.proteins.is_empty()
    }

    /// Parses a cluster from FASTA or a plain list of accessions
    ///
    /// # Errors
    ///
    /// [`GoError::Io`] if the reader fails
    pub fn from_reader<R: BufRead>(name: &str, reader: R) -> GoResult<Self> {
        let mut proteins = Vec::new();
        let mut lines = Vec::new();
        let mut fasta = false;
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(header) = line.strip_prefix('>') {
                fasta = true;
                if let Some(accession) = accession_from_header(header) {
                    proteins.push(ProteinId::from(accession));
                }
            } else if !fasta {
                lines.push(line.to_string());
            }
        }
        if !fasta {
            proteins = lines
                .iter()
                .filter_map(|line| line.split_whitespace().next())
                .map(ProteinId::from)
                .collect();
        }
        Ok(Self::new(name, proteins))
    }

    /// Reads a cluster file, using the file name as cluster ID
    ///
    /// # Errors
    ///
    /// [`GoError::CannotOpenFile`] if the file cannot be opened
    pub fn from_file<P: AsRef<Path>>(path: P) -> GoResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| GoError::CannotOpenFile(path.display().to_string()))?;
        let file =
            File::open(path).map_err(|_| GoError::CannotOpenFile(path.display().to_string()))?;
        Self::from_reader(&name, BufReader::new(file))
    }
}

/// Extracts the accession from a FASTA header (without `>`)
///
/// UniProt headers (`sp|P04637|P53_HUMAN ...`) use the second field,
/// all other headers the first word.
fn accession_from_header(header: &str) -> Option<&str> {
    let first_word = header.split_whitespace().next()?;
    let mut fields = first_word.split('|');
    let first = fields.next()?;
    match fields.next() {
        Some(accession) if !accession.is_empty() => Some(accession),
        _ if !first.is_empty() => Some(first),
        _ => None,
    }
}

/// Returns the cluster files of `dir`, sorted by name
///
/// Hidden files and sub-directories are not cluster files.
pub(crate) fn cluster_files(dir: &Path) -> GoResult<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map_or(false, |name| !name.to_string_lossy().starts_with('.'))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Reads every cluster file of a directory
///
/// Files are processed in order of their names, so the order of clusters
/// is the same on every run. Hidden files and sub-directories are ignored.
/// A file that cannot be read is logged and skipped.
///
/// # Errors
///
/// - [`GoError::MissingInput`] if the directory does not exist
/// - [`GoError::EmptyClusterDirectory`] if it contains no cluster file
pub fn read_cluster_dir<P: AsRef<Path>>(dir: P) -> GoResult<Vec<Cluster>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(GoError::MissingInput(dir.display().to_string()));
    }
    let paths = cluster_files(dir)?;
    if paths.is_empty() {
        return Err(GoError::EmptyClusterDirectory(dir.display().to_string()));
    }

    let mut clusters = Vec::with_capacity(paths.len());
    for path in paths {
        match Cluster::from_file(&path) {
            Ok(cluster) => {
                debug!("Read cluster {} with {} proteins", cluster.name(), cluster.len());
                clusters.push(cluster);
            }
            Err(err) => warn!("Skipping cluster file {}: {}", path.display(), err),
        }
    }
    Ok(clusters)
}
