//! Proteins and their GO annotations
//!
//! Annotations come in two stages, tracked by a type-level marker:
//!
//! - [`AnnotationMap<Direct>`](`AnnotationMap`) holds the terms a protein is directly
//!   annotated with, already restricted to one [`Aspect`]
//! - [`ClosedAnnotationMap`] additionally holds every ancestor of those terms.
//!   It is produced by [`crate::closure::close`] and is the background for all
//!   enrichment tests.
//!
//! Keeping both stages as distinct types makes it impossible to run an
//! enrichment against annotations that were never expanded.
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Display;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Aspect, GoTermId, TermGroup};

/// The accession of a protein, e.g. `P04637`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProteinId {
    inner: String,
}

impl ProteinId {
    /// The accession as `&str`
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl From<String> for ProteinId {
    fn from(inner: String) -> Self {
        Self { inner }
    }
}

impl From<&str> for ProteinId {
    fn from(s: &str) -> Self {
        Self {
            inner: s.to_string(),
        }
    }
}

impl Display for ProteinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// A single annotation line of a GO annotation file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    protein: ProteinId,
    term: GoTermId,
    aspect: Aspect,
    evidence: String,
}

impl AnnotationRecord {
    /// Constructs a new [`AnnotationRecord`]
    pub fn new(protein: ProteinId, term: GoTermId, aspect: Aspect, evidence: &str) -> Self {
        Self {
            protein,
            term,
            aspect,
            evidence: evidence.to_string(),
        }
    }

    /// The annotated protein
    pub fn protein(&self) -> &ProteinId {
        &self.protein
    }

    /// The annotated term
    pub fn term(&self) -> GoTermId {
        self.term
    }

    /// The aspect of the annotated term
    pub fn aspect(&self) -> Aspect {
        self.aspect
    }

    /// The GO evidence code, e.g. `IEA` or `IDA`
    pub fn evidence(&self) -> &str {
        &self.evidence
    }
}

/// Marker for annotations as provided by the annotation source
#[derive(Debug, Clone, Copy)]
pub struct Direct;

/// Marker for annotations that include all ancestor terms
#[derive(Debug, Clone, Copy)]
pub struct Closed;

/// Mapping of every known protein to its set of GO terms
///
/// Every protein known to the analysis is a key of the map, even
/// if it has no annotations at all.
#[derive(Debug, Clone)]
pub struct AnnotationMap<S = Direct> {
    proteins: HashMap<ProteinId, TermGroup>,
    state: PhantomData<S>,
}

/// Annotations that include the ancestors of every directly annotated term
pub type ClosedAnnotationMap = AnnotationMap<Closed>;

impl<S> AnnotationMap<S> {
    /// Returns the number of proteins, annotated or not
    pub fn len(&self) -> usize {
        self.proteins.len()
    }

    /// Returns `true` if no protein is known
    pub fn is_empty(&self) -> bool {
        self.proteins.is_empty()
    }

    /// Returns the number of proteins with at least one term
    pub fn annotated_len(&self) -> usize {
        self.proteins.values().filter(|terms| !terms.is_empty()).count()
    }

    /// Returns the terms of the protein
    ///
    /// Returns `None` if the protein is not known
    pub fn get(&self, protein: &ProteinId) -> Option<&TermGroup> {
        self.proteins.get(protein)
    }

    /// Returns `true` if the protein is part of the map
    pub fn contains(&self, protein: &ProteinId) -> bool {
        self.proteins.contains_key(protein)
    }

    /// Iterates all proteins with their terms, in arbitrary order
    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, ProteinId, TermGroup> {
        self.proteins.iter()
    }

    /// Returns every distinct term used by any protein
    pub fn terms(&self) -> TermGroup {
        let mut all = HashSet::new();
        for terms in self.proteins.values() {
            all.extend(terms.iter());
        }
        TermGroup::from(all)
    }

    /// Returns the map with proteins in sorted order
    ///
    /// Used for serialization, so that written files are reproducible
    pub fn to_sorted(&self) -> BTreeMap<&ProteinId, Vec<GoTermId>> {
        self.proteins
            .iter()
            .map(|(protein, terms)| (protein, terms.iter().collect()))
            .collect()
    }
}

impl Default for AnnotationMap<Direct> {
    fn default() -> Self {
        Self {
            proteins: HashMap::default(),
            state: PhantomData,
        }
    }
}

impl AnnotationMap<Direct> {
    /// Constructs a new, empty [`AnnotationMap`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the direct annotations from raw annotation records
    ///
    /// Only records of the requested `aspect` are used and records with
    /// an evidence code listed in `exclude_evidence` are dropped.
    /// Proteins whose records are all dropped remain in the map with an
    /// empty set of terms.
    pub fn from_records<I: IntoIterator<Item = AnnotationRecord>>(
        records: I,
        aspect: Aspect,
        exclude_evidence: &HashSet<String>,
    ) -> Self {
        let mut map = Self::new();
        let mut skipped_aspect = 0usize;
        let mut skipped_evidence = 0usize;
        for record in records {
            if record.aspect != aspect {
                skipped_aspect += 1;
                map.add_protein(record.protein);
                continue;
            }
            if exclude_evidence.contains(&record.evidence) {
                skipped_evidence += 1;
                map.add_protein(record.protein);
                continue;
            }
            map.add_annotation(record.protein, record.term);
        }
        debug!(
            "Skipped {} annotations of other aspects and {} with excluded evidence",
            skipped_aspect, skipped_evidence
        );
        map
    }

    /// Adds the protein without any annotation, unless it is present already
    pub fn add_protein(&mut self, protein: ProteinId) {
        self.proteins.entry(protein).or_default();
    }

    /// Annotates the protein with one more term
    ///
    /// Returns whether the term was newly added
    pub fn add_annotation(&mut self, protein: ProteinId, term: GoTermId) -> bool {
        self.proteins.entry(protein).or_default().insert(term)
    }

    /// Adds all `terms` to the protein
    pub fn insert(&mut self, protein: ProteinId, terms: TermGroup) {
        match self.proteins.entry(protein) {
            Entry::Occupied(mut entry) => entry.get_mut().extend_from(&terms),
            Entry::Vacant(entry) => {
                entry.insert(terms);
            }
        }
    }

    /// Removes every term for which `keep` returns `false`
    ///
    /// Proteins stay in the map, even if all their terms are removed.
    /// Returns the number of removed annotations.
    pub fn retain_terms<F: FnMut(GoTermId) -> bool>(&mut self, mut keep: F) -> usize {
        let mut removed = 0;
        for terms in self.proteins.values_mut() {
            let before = terms.len();
            let kept: TermGroup = terms.iter().filter(|term| keep(*term)).collect();
            removed += before - kept.len();
            *terms = kept;
        }
        removed
    }

    /// Treats the annotations as closed already
    ///
    /// Use this when the annotations were expanded by an earlier run,
    /// e.g. when loading a previously written `go_annotations.json`
    pub fn assume_closed(self) -> ClosedAnnotationMap {
        AnnotationMap {
            proteins: self.proteins,
            state: PhantomData,
        }
    }

    pub(crate) fn into_inner(self) -> HashMap<ProteinId, TermGroup> {
        self.proteins
    }
}

impl AnnotationMap<Closed> {
    pub(crate) fn from_closed(proteins: HashMap<ProteinId, TermGroup>) -> Self {
        Self {
            proteins,
            state: PhantomData,
        }
    }
}
