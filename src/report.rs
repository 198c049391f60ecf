//! Writing the enrichment and ranking reports
//!
//! Both reports are tab-separated with a fixed header. A report is first
//! written to a hidden sibling file and moved into place once it is
//! complete, so a report file is either absent or whole.
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::{EnrichmentResult, GoError, GoResult, RankedCluster};

/// Column headers of the enrichment report
pub const ENRICHMENT_HEADER: [&str; 11] = [
    "cluster_id",
    "go_id",
    "pvalue",
    "M",
    "m",
    "N",
    "x",
    "bonferroni_threshold",
    "bonferroni_pass",
    "bh_pvalue",
    "bh_pass",
];

/// Column headers of the ranking report
pub const RANKING_HEADER: [&str; 5] = [
    "cluster_id",
    "cluster_size",
    "s_measure",
    "representative_go_id",
    "representative_go_name",
];

/// A file that only appears at its final path once committed
///
/// Dropping an uncommitted file removes the temporary file.
#[derive(Debug)]
pub struct AtomicFile {
    file: File,
    tmp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl AtomicFile {
    /// Creates the temporary sibling of `path`
    ///
    /// # Errors
    ///
    /// [`GoError::CannotOpenFile`] if the temporary file cannot be created
    pub fn create<P: AsRef<Path>>(path: P) -> GoResult<Self> {
        let target = path.as_ref().to_path_buf();
        let name = target
            .file_name()
            .ok_or_else(|| GoError::CannotOpenFile(target.display().to_string()))?
            .to_string_lossy()
            .to_string();
        let tmp = target.with_file_name(format!(".{name}.tmp"));
        let file =
            File::create(&tmp).map_err(|_| GoError::CannotOpenFile(tmp.display().to_string()))?;
        Ok(Self {
            file,
            tmp,
            target,
            committed: false,
        })
    }

    /// The open temporary file
    pub fn handle(&self) -> &File {
        &self.file
    }

    /// Flushes the data to disk and moves the file to its final path
    ///
    /// # Errors
    ///
    /// [`GoError::Io`] if syncing or renaming fails
    pub fn commit(mut self) -> GoResult<()> {
        self.file.sync_all()?;
        fs::rename(&self.tmp, &self.target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(err) = fs::remove_file(&self.tmp) {
                warn!("Unable to remove {}: {}", self.tmp.display(), err);
            }
        }
    }
}

fn tsv_writer<W: Write>(writer: W, header: &[&str]) -> GoResult<csv::Writer<W>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(header)?;
    Ok(writer)
}

fn write_rows<T: Serialize, W: Write>(rows: &[T], header: &[&str], writer: W) -> GoResult<()> {
    let mut writer = tsv_writer(writer, header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_atomic<T: Serialize, P: AsRef<Path>>(rows: &[T], header: &[&str], path: P) -> GoResult<()> {
    let file = AtomicFile::create(&path)?;
    write_rows(rows, header, file.handle())?;
    file.commit()?;
    info!("Wrote {} rows to {}", rows.len(), path.as_ref().display());
    Ok(())
}

/// Writes the enrichment report to `writer`
///
/// The header is written even if there are no rows.
///
/// # Errors
///
/// [`GoError::Csv`] or [`GoError::Io`] if writing fails
pub fn enrichment_to_writer<W: Write>(results: &[EnrichmentResult], writer: W) -> GoResult<()> {
    write_rows(results, &ENRICHMENT_HEADER, writer)
}

/// Writes the enrichment report file
///
/// # Errors
///
/// - [`GoError::CannotOpenFile`] if the file cannot be created
/// - [`GoError::Csv`] or [`GoError::Io`] if writing fails
pub fn write_enrichment<P: AsRef<Path>>(results: &[EnrichmentResult], path: P) -> GoResult<()> {
    write_atomic(results, &ENRICHMENT_HEADER, path)
}

/// Writes the ranking report to `writer`
///
/// # Errors
///
/// [`GoError::Csv`] or [`GoError::Io`] if writing fails
pub fn ranking_to_writer<W: Write>(ranking: &[RankedCluster], writer: W) -> GoResult<()> {
    write_rows(ranking, &RANKING_HEADER, writer)
}

/// Writes the ranking report file
///
/// # Errors
///
/// - [`GoError::CannotOpenFile`] if the file cannot be created
/// - [`GoError::Csv`] or [`GoError::Io`] if writing fails
pub fn write_ranking<P: AsRef<Path>>(ranking: &[RankedCluster], path: P) -> GoResult<()> {
    write_atomic(ranking, &RANKING_HEADER, path)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ranking::{rank, resolve_names};
    use crate::term::GoTerm;
    use crate::{Aspect, TermTable};

    fn results() -> Vec<EnrichmentResult> {
        vec![
            EnrichmentResult::fixture("c1", 1, 4, 3, true),
            EnrichmentResult::fixture("c2", 2, 10, 2, false),
        ]
    }

    #[test]
    fn enrichment_header_and_rows() {
        let mut out = Vec::new();
        enrichment_to_writer(&results(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), ENRICHMENT_HEADER.join("\t"));
        assert_eq!(
            lines.next().unwrap(),
            "c1\tGO:0000001\t0.001\t1000\t50\t4\t3\t0.05\ttrue\t0.002\ttrue"
        );
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn empty_report_has_header() {
        let mut out = Vec::new();
        ranking_to_writer(&[], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{}\n", RANKING_HEADER.join("\t"))
        );
    }

    #[test]
    fn enrichment_report_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enrichment_results.tsv");
        write_enrichment(&results(), &path).unwrap();
        let back = crate::parser::enrichment_report::read(&path).unwrap();
        assert_eq!(back, results());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn ranking_file() {
        let mut table = TermTable::default();
        table.insert_term(GoTerm::new(1u32.into(), Aspect::MolecularFunction, "kinase activity"));
        let ranked = resolve_names(&rank(&results(), 2), &table).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clusters_s_values.tsv");
        write_ranking(&ranked, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "cluster_id\tcluster_size\ts_measure\trepresentative_go_id\trepresentative_go_name\nc1\t4\t0.75\tGO:0000001\tkinase activity\n"
        );
    }

    #[test]
    fn uncommitted_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.tsv");
        {
            let file = AtomicFile::create(&path).unwrap();
            write_rows(&results(), &ENRICHMENT_HEADER, file.handle()).unwrap();
        }
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
