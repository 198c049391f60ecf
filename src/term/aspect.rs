use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::GoError;

/// The three sub-ontologies of the Gene Ontology
///
/// Each analysis is restricted to a single aspect. Annotations
/// and ancestors of other aspects are ignored.
///
/// # Examples
///
/// ```
/// use gbsc_enrich::Aspect;
///
/// let aspect: Aspect = "F".parse().unwrap();
/// assert_eq!(aspect, Aspect::MolecularFunction);
/// assert_eq!(aspect.to_string(), "molecular_function");
///
/// let aspect: Aspect = "biological_process".parse().unwrap();
/// assert_eq!(aspect.code(), 'P');
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    #[default]
    MolecularFunction,
    BiologicalProcess,
    CellularComponent,
}

impl Aspect {
    /// The single-letter code used by GO annotation files
    pub fn code(&self) -> char {
        match self {
            Aspect::MolecularFunction => 'F',
            Aspect::BiologicalProcess => 'P',
            Aspect::CellularComponent => 'C',
        }
    }

    /// The full name of the aspect
    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::MolecularFunction => "molecular_function",
            Aspect::BiologicalProcess => "biological_process",
            Aspect::CellularComponent => "cellular_component",
        }
    }
}

impl FromStr for Aspect {
    type Err = GoError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "F" | "molecular_function" => Ok(Aspect::MolecularFunction),
            "P" | "biological_process" => Ok(Aspect::BiologicalProcess),
            "C" | "cellular_component" => Ok(Aspect::CellularComponent),
            other => Err(GoError::InvalidInput(format!("unknown GO aspect: {other}"))),
        }
    }
}

impl Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
