//! Gene Ontology terms and sets of terms
//!
//! A GO term is identified by a [`GoTermId`] (`GO:0016301`) and belongs
//! to exactly one [`Aspect`]. Annotations of proteins and ancestors of
//! terms are stored as [`TermGroup`]s.

mod aspect;
mod gotermid;
mod group;

pub use aspect::Aspect;
pub use gotermid::GoTermId;
pub use group::{TermGroup, TermIds};

/// A single GO term with its aspect and human-readable name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoTerm {
    id: GoTermId,
    aspect: Aspect,
    name: String,
}

impl GoTerm {
    /// Constructs a new [`GoTerm`]
    pub fn new(id: GoTermId, aspect: Aspect, name: &str) -> Self {
        Self {
            id,
            aspect,
            name: name.to_string(),
        }
    }

    /// The [`GoTermId`] of the term
    pub fn id(&self) -> GoTermId {
        self.id
    }

    /// The [`Aspect`] (sub-ontology) of the term
    pub fn aspect(&self) -> Aspect {
        self.aspect
    }

    /// The name of the term, e.g. `kinase activity`
    pub fn name(&self) -> &str {
        &self.name
    }
}
