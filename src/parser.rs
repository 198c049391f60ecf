//! Parsing the input and intermediate files of an analysis
//!
//! All tabular files are tab-separated. Lines starting with `#` are comments.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::{GoError, GoResult};

pub(crate) fn open_file<P: AsRef<Path>>(path: P) -> GoResult<BufReader<File>> {
    let path = path.as_ref();
    File::open(path)
        .map(BufReader::new)
        .map_err(|_| GoError::CannotOpenFile(path.display().to_string()))
}

/// Returns the non-empty lines of `reader` that are not comments
fn data_lines<R: BufRead>(reader: R) -> impl Iterator<Item = GoResult<String>> {
    reader
        .lines()
        .map(|line| line.map_err(GoError::from))
        .filter(|line| match line {
            Ok(line) => !line.trim().is_empty() && !line.starts_with('#'),
            Err(_) => true,
        })
}

/// Module to parse QuickGO annotation downloads
///
/// The relevant columns of the `downloadSearch` TSV export are
///
/// | Column | Content |
/// |---|---|
/// | 2 | Gene product ID (protein accession) |
/// | 5 | GO term |
/// | 6 | GO aspect |
/// | 8 | GO evidence code |
pub mod quickgo {
    use std::collections::HashSet;
    use std::io::BufRead;
    use std::path::Path;

    use tracing::debug;

    use crate::annotations::{AnnotationMap, AnnotationRecord};
    use crate::parser::{data_lines, open_file};
    use crate::{Aspect, GoError, GoResult, GoTermId, ProteinId};

    const HEADER: &str = "GENE PRODUCT DB";

    /// Parses a single data line
    fn record(line: &str) -> GoResult<AnnotationRecord> {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 8 {
            return Err(GoError::InvalidInput(format!(
                "expected at least 8 columns in annotation line: {line}"
            )));
        }
        let protein = ProteinId::from(cols[1].trim());
        let term = GoTermId::try_from(cols[4].trim())?;
        let aspect: Aspect = cols[5].trim().parse()?;
        Ok(AnnotationRecord::new(protein, term, aspect, cols[7].trim()))
    }

    /// Parses all annotation records, skipping header lines
    ///
    /// # Errors
    ///
    /// [`GoError::InvalidInput`] if a line is malformed
    pub fn records<R: BufRead>(reader: R) -> GoResult<Vec<AnnotationRecord>> {
        let mut records = Vec::new();
        for line in data_lines(reader) {
            let line = line?;
            if line.starts_with(HEADER) {
                continue;
            }
            records.push(record(&line)?);
        }
        debug!("Parsed {} annotation records", records.len());
        Ok(records)
    }

    /// Builds the direct annotations of `aspect` from a QuickGO TSV file
    ///
    /// Every protein of `proteins` is part of the result, even if the
    /// file has no annotation for it.
    ///
    /// # Errors
    ///
    /// - [`GoError::CannotOpenFile`] if the file cannot be opened
    /// - [`GoError::InvalidInput`] if a line is malformed
    pub fn annotations<P: AsRef<Path>>(
        path: P,
        aspect: Aspect,
        exclude_evidence: &HashSet<String>,
        proteins: &[ProteinId],
    ) -> GoResult<AnnotationMap> {
        let records = records(open_file(path)?)?;
        let mut map = AnnotationMap::from_records(records, aspect, exclude_evidence);
        for protein in proteins {
            map.add_protein(protein.clone());
        }
        Ok(map)
    }

    #[cfg(test)]
    mod test {
        use super::*;

        const DATA: &str = "GENE PRODUCT DB\tGENE PRODUCT ID\tSYMBOL\tQUALIFIER\tGO TERM\tGO ASPECT\tECO ID\tGO EVIDENCE CODE\tREFERENCE
UniProtKB\tP04637\tTP53\tenables\tGO:0003677\tF\tECO:0000314\tIDA\tPMID:1
UniProtKB\tP04637\tTP53\tenables\tGO:0005515\tF\tECO:0000501\tIEA\tGO_REF:2
UniProtKB\tP04637\tTP53\tinvolved_in\tGO:0006915\tP\tECO:0000315\tIMP\tPMID:3
UniProtKB\tQ00001\tXYZ\tenables\tGO:0005515\tmolecular_function\tECO:0000501\tIEA\tGO_REF:2
";

        #[test]
        fn parse_records() {
            let records = records(DATA.as_bytes()).unwrap();
            assert_eq!(records.len(), 4);
            assert_eq!(records[0].protein().as_str(), "P04637");
            assert_eq!(records[0].term(), GoTermId::from(3677u32));
            assert_eq!(records[2].aspect(), Aspect::BiologicalProcess);
            assert_eq!(records[3].aspect(), Aspect::MolecularFunction);
            assert_eq!(records[1].evidence(), "IEA");
        }

        #[test]
        fn evidence_is_excluded() {
            let exclude: HashSet<String> = ["IEA".to_string()].into_iter().collect();
            let map = AnnotationMap::from_records(
                records(DATA.as_bytes()).unwrap(),
                Aspect::MolecularFunction,
                &exclude,
            );
            assert_eq!(map.len(), 2);
            assert_eq!(map.get(&"P04637".into()).unwrap().len(), 1);
            assert!(map.get(&"Q00001".into()).unwrap().is_empty());
        }

        #[test]
        fn malformed_line() {
            assert!(records("UniProtKB\tP1\tX\n".as_bytes()).is_err());
            assert!(records("UniProtKB\tP1\tX\tenables\tGO:1\tX\tECO\tIDA\n".as_bytes()).is_err());
        }
    }
}

/// Module to read and write protein annotations as JSON
///
/// The file is a single object mapping each protein to its list of terms
///
/// ```json
/// {"P04637": ["GO:0003674", "GO:0003677"], "Q00001": []}
/// ```
pub mod annotation_json {
    use std::collections::BTreeMap;
    use std::io::{BufWriter, Read, Write};
    use std::path::Path;

    use tracing::info;

    use crate::annotations::AnnotationMap;
    use crate::parser::open_file;
    use crate::report::AtomicFile;
    use crate::{GoResult, GoTermId, ProteinId, TermGroup};

    /// Parses annotations from JSON
    ///
    /// # Errors
    ///
    /// [`crate::GoError::Json`] if the data is not a valid annotation object
    pub fn from_reader<R: Read>(reader: R) -> GoResult<AnnotationMap> {
        let raw: BTreeMap<ProteinId, Vec<GoTermId>> = serde_json::from_reader(reader)?;
        let mut map = AnnotationMap::new();
        for (protein, terms) in raw {
            map.insert(protein, TermGroup::from(terms));
        }
        Ok(map)
    }

    /// Reads annotations from a JSON file
    ///
    /// # Errors
    ///
    /// - [`crate::GoError::CannotOpenFile`] if the file cannot be opened
    /// - [`crate::GoError::Json`] if the file is not a valid annotation object
    pub fn read<P: AsRef<Path>>(path: P) -> GoResult<AnnotationMap> {
        let map = from_reader(open_file(&path)?)?;
        info!(
            "Read annotations of {} proteins from {}",
            map.len(),
            path.as_ref().display()
        );
        Ok(map)
    }

    /// Writes annotations as JSON, sorted by protein and term
    ///
    /// # Errors
    ///
    /// [`crate::GoError::Json`] or [`crate::GoError::Io`] if writing fails
    pub fn to_writer<S, W: Write>(annotations: &AnnotationMap<S>, writer: W) -> GoResult<()> {
        serde_json::to_writer(writer, &annotations.to_sorted())?;
        Ok(())
    }

    /// Writes annotations to a JSON file, replacing it atomically
    ///
    /// # Errors
    ///
    /// [`crate::GoError::Json`] or [`crate::GoError::Io`] if writing fails
    pub fn write<S, P: AsRef<Path>>(annotations: &AnnotationMap<S>, path: P) -> GoResult<()> {
        let file = AtomicFile::create(path)?;
        let mut writer = BufWriter::new(file.handle());
        to_writer(annotations, &mut writer)?;
        writer.flush()?;
        drop(writer);
        file.commit()
    }

}

/// Module to parse the GO name table and the ancestor table into a [`crate::TermTable`]
///
/// The name table has the columns `go_id`, `name` and `aspect`:
///
/// ```text
/// GO:0003674	molecular_function	molecular_function
/// GO:0016301	kinase activity	molecular_function
/// ```
///
/// The ancestor table lists one `go_id`, `ancestor_id` pair per line.
pub mod term_table {
    use std::io::BufRead;
    use std::path::Path;

    use tracing::{info, warn};

    use crate::parser::{data_lines, open_file};
    use crate::term::GoTerm;
    use crate::{Aspect, GoError, GoResult, GoTermId, TermTable};

    /// Adds the terms of a name table to `table`
    ///
    /// A missing or unknown aspect column defaults to
    /// [`Aspect::MolecularFunction`] with a warning.
    ///
    /// # Errors
    ///
    /// [`GoError::InvalidInput`] if a line has no name or an invalid ID
    pub fn names_from_reader<R: BufRead>(reader: R, table: &mut TermTable) -> GoResult<usize> {
        let mut count = 0;
        for line in data_lines(reader) {
            let line = line?;
            let mut cols = line.split('\t');
            let (Some(id), Some(name)) = (cols.next(), cols.next()) else {
                return Err(GoError::InvalidInput(format!("missing name in line: {line}")));
            };
            let id = GoTermId::try_from(id.trim())?;
            let aspect = match cols.next().map(|aspect| aspect.trim().parse::<Aspect>()) {
                Some(Ok(aspect)) => aspect,
                _ => {
                    warn!("No valid aspect for {}", id);
                    Aspect::default()
                }
            };
            table.insert_term(GoTerm::new(id, aspect, name.trim()));
            count += 1;
        }
        Ok(count)
    }

    /// Adds the relations of an ancestor table to `table`
    ///
    /// # Errors
    ///
    /// [`GoError::InvalidInput`] if a line does not have two valid IDs
    pub fn ancestors_from_reader<R: BufRead>(reader: R, table: &mut TermTable) -> GoResult<usize> {
        let mut count = 0;
        for line in data_lines(reader) {
            let line = line?;
            let mut cols = line.split('\t');
            let (Some(term), Some(ancestor)) = (cols.next(), cols.next()) else {
                return Err(GoError::InvalidInput(format!("missing ancestor in line: {line}")));
            };
            let term = GoTermId::try_from(term.trim())?;
            let ancestor = GoTermId::try_from(ancestor.trim())?;
            if table.add_ancestor(term, ancestor) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Loads a [`TermTable`] from a name table and an optional ancestor table
    ///
    /// # Errors
    ///
    /// - [`GoError::CannotOpenFile`] if a file cannot be opened
    /// - [`GoError::InvalidInput`] if a file is malformed
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(names: P, ancestors: Option<Q>) -> GoResult<TermTable> {
        let mut table = TermTable::default();
        let terms = names_from_reader(open_file(&names)?, &mut table)?;
        info!("Read {} GO names from {}", terms, names.as_ref().display());
        if let Some(path) = ancestors {
            let relations = ancestors_from_reader(open_file(&path)?, &mut table)?;
            info!(
                "Read {} ancestor relations from {}",
                relations,
                path.as_ref().display()
            );
        }
        Ok(table)
    }

    #[cfg(test)]
    mod test {
        use super::*;
        use crate::OntologyService;

        #[test]
        fn parse_names_and_ancestors() {
            let names = "# go_id\tname\taspect\nGO:0003674\tmolecular_function\tmolecular_function\nGO:0016301\tkinase activity\tF\nGO:0008150\tbiological_process\n";
            let ancestors = "GO:0016301\tGO:0003674\nGO:0016301\tGO:0016301\n";
            let mut table = TermTable::default();
            assert_eq!(names_from_reader(names.as_bytes(), &mut table).unwrap(), 3);
            assert_eq!(ancestors_from_reader(ancestors.as_bytes(), &mut table).unwrap(), 1);

            assert_eq!(table.name(16301u32.into()), Some("kinase activity"));
            assert_eq!(table.aspect(8150u32.into()), Some(Aspect::MolecularFunction));
            let resolved = table
                .resolve_ancestors(16301u32.into(), Aspect::MolecularFunction)
                .unwrap();
            assert_eq!(resolved.len(), 1);
        }

        #[test]
        fn invalid_lines() {
            let mut table = TermTable::default();
            assert!(names_from_reader("GO:0000001\n".as_bytes(), &mut table).is_err());
            assert!(names_from_reader("0000001\tname\tF\n".as_bytes(), &mut table).is_err());
            assert!(ancestors_from_reader("GO:0000001\n".as_bytes(), &mut table).is_err());
        }

        #[test]
        fn missing_file() {
            assert!(matches!(
                load("/does/not/exist/go_names.csv", None::<&str>),
                Err(GoError::CannotOpenFile(_))
            ));
        }
    }
}

/// Module to parse a saved enrichment report
///
/// The file must have the header written by [`crate::report::write_enrichment`].
/// Boolean columns accept `true`/`false` in any case.
pub mod enrichment_report {
    use std::io::Read;
    use std::path::Path;

    use crate::parser::open_file;
    use crate::{EnrichmentResult, GoResult};

    /// Parses all rows of an enrichment report, in file order
    ///
    /// # Errors
    ///
    /// [`crate::GoError::Csv`] if the header or a row is invalid
    pub fn from_reader<R: Read>(reader: R) -> GoResult<Vec<EnrichmentResult>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(reader);
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Reads an enrichment report file
    ///
    /// # Errors
    ///
    /// - [`crate::GoError::CannotOpenFile`] if the file cannot be opened
    /// - [`crate::GoError::Csv`] if the header or a row is invalid
    pub fn read<P: AsRef<Path>>(path: P) -> GoResult<Vec<EnrichmentResult>> {
        from_reader(open_file(path)?)
    }

}

/// Reads a list of protein accessions, one per line
///
/// Only the first word of every line is used.
///
/// # Errors
///
/// - [`GoError::CannotOpenFile`] if the file cannot be opened
/// - [`GoError::Io`] if reading fails
pub fn protein_list<P: AsRef<Path>>(path: P) -> GoResult<Vec<crate::ProteinId>> {
    let mut proteins = Vec::new();
    for line in data_lines(open_file(path)?) {
        let line = line?;
        if let Some(accession) = line.split_whitespace().next() {
            proteins.push(crate::ProteinId::from(accession));
        }
    }
    Ok(proteins)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn protein_accessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proteins.txt");
        fs::write(&path, "# background\nP04637\n\nQ9Y6K9 extra columns\n").unwrap();
        let proteins = protein_list(&path).unwrap();
        let ids: Vec<&str> = proteins.iter().map(|p| p.as_str()).collect();
        assert_eq!(ids, vec!["P04637", "Q9Y6K9"]);
    }

    #[test]
    fn missing_protein_list() {
        assert!(matches!(
            protein_list("/does/not/exist.txt"),
            Err(GoError::CannotOpenFile(_))
        ));
    }
}
