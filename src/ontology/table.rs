use std::collections::HashMap;

use tracing::debug;

use crate::ontology::OntologyService;
use crate::term::GoTerm;
use crate::{Aspect, GoResult, GoTermId, TermGroup};

/// An in-memory [`OntologyService`]
///
/// The table holds the name and aspect of every term and, optionally,
/// the ancestors of terms. It is usually loaded from the GO name table
/// and the ancestor table of a project directory, see [`crate::parser`].
///
/// Ancestors whose aspect is unknown to the table are never returned.
///
/// # Examples
///
/// ```
/// use gbsc_enrich::{Aspect, GoTermId, OntologyService, TermTable};
/// use gbsc_enrich::term::GoTerm;
///
/// let mut table = TermTable::default();
/// table.insert_term(GoTerm::new(3674u32.into(), Aspect::MolecularFunction, "molecular_function"));
/// table.insert_term(GoTerm::new(16301u32.into(), Aspect::MolecularFunction, "kinase activity"));
/// table.insert_term(GoTerm::new(8150u32.into(), Aspect::BiologicalProcess, "biological_process"));
/// table.add_ancestor(16301u32.into(), 3674u32.into());
/// table.add_ancestor(16301u32.into(), 8150u32.into());
///
/// let ancestors = table
///     .resolve_ancestors(16301u32.into(), Aspect::MolecularFunction)
///     .unwrap();
/// assert_eq!(ancestors.len(), 1);
///
/// let name = table.resolve_name(16301u32.into()).unwrap();
/// assert_eq!(name.as_deref(), Some("kinase activity"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct TermTable {
    terms: HashMap<GoTermId, GoTerm>,
    ancestors: HashMap<GoTermId, TermGroup>,
}

impl TermTable {
    /// Returns the number of terms with a name
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if the table has no named terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Adds a term, replacing a previous entry with the same ID
    pub fn insert_term(&mut self, term: GoTerm) {
        self.terms.insert(term.id(), term);
    }

    /// Records that `ancestor` is an ancestor of `term`
    ///
    /// Returns whether the relation was new. A term is never its own ancestor.
    pub fn add_ancestor(&mut self, term: GoTermId, ancestor: GoTermId) -> bool {
        if term == ancestor {
            return false;
        }
        self.ancestors.entry(term).or_default().insert(ancestor)
    }

    /// Returns the term
    pub fn term(&self, id: GoTermId) -> Option<&GoTerm> {
        self.terms.get(&id)
    }

    /// Returns the name of the term
    pub fn name(&self, id: GoTermId) -> Option<&str> {
        self.terms.get(&id).map(GoTerm::name)
    }

    /// Returns the aspect of the term
    pub fn aspect(&self, id: GoTermId) -> Option<Aspect> {
        self.terms.get(&id).map(GoTerm::aspect)
    }

    /// Returns the number of terms with known ancestors
    pub fn ancestor_len(&self) -> usize {
        self.ancestors.len()
    }
}

impl OntologyService for TermTable {
    fn resolve_ancestors(&self, term: GoTermId, aspect: Aspect) -> GoResult<TermGroup> {
        let Some(ancestors) = self.ancestors.get(&term) else {
            debug!("No ancestors recorded for {}", term);
            return Ok(TermGroup::new());
        };
        Ok(ancestors
            .iter()
            .filter(|ancestor| self.aspect(*ancestor) == Some(aspect))
            .collect())
    }

    fn resolve_name(&self, term: GoTermId) -> GoResult<Option<String>> {
        Ok(self.name(term).map(String::from))
    }
}
