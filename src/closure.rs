//! Expansion of direct annotations to their ancestors
//!
//! A protein annotated with `kinase activity` is implicitly annotated with
//! `catalytic activity` and every other ancestor of that term as well.
//! The enrichment needs these implicit annotations, otherwise general
//! terms are never found enriched.
use std::collections::HashMap;

use rayon::prelude::*;
use tracing::info;

use crate::annotations::{AnnotationMap, ClosedAnnotationMap, Direct};
use crate::ontology::{AncestorCache, OntologyService};
use crate::{Aspect, GoTermId, TermGroup};

/// Adds the ancestors of every directly annotated term to each protein
///
/// Ancestors that are not in `cache` yet are resolved via `service` and
/// stored in the cache, so later calls with the same cache never ask
/// the service for the same term again. The ancestors are expected to be
/// transitively closed already, they are not expanded recursively.
///
/// A term that cannot be resolved contributes no ancestors, it does not
/// fail the closure. Proteins without any annotation stay in the map with
/// an empty set of terms.
///
/// # Examples
///
/// ```
/// use gbsc_enrich::{AncestorCache, AnnotationMap, Aspect, GoTermId, TermTable};
/// use gbsc_enrich::closure::close;
/// use gbsc_enrich::term::GoTerm;
///
/// let mut table = TermTable::default();
/// table.insert_term(GoTerm::new(3674u32.into(), Aspect::MolecularFunction, "molecular_function"));
/// table.insert_term(GoTerm::new(16301u32.into(), Aspect::MolecularFunction, "kinase activity"));
/// table.add_ancestor(16301u32.into(), 3674u32.into());
///
/// let mut annotations = AnnotationMap::new();
/// annotations.add_annotation("P00533".into(), 16301u32.into());
/// annotations.add_protein("Q00000".into());
///
/// let cache = AncestorCache::new();
/// let closed = close(annotations, &cache, &table, Aspect::MolecularFunction);
///
/// let terms = closed.get(&"P00533".into()).unwrap();
/// assert!(terms.contains(&GoTermId::from(3674u32)));
/// assert!(terms.contains(&GoTermId::from(16301u32)));
/// assert!(closed.get(&"Q00000".into()).unwrap().is_empty());
/// ```
pub fn close<S: OntologyService>(
    annotations: AnnotationMap<Direct>,
    cache: &AncestorCache,
    service: &S,
    aspect: Aspect,
) -> ClosedAnnotationMap {
    let terms = annotations.terms();
    let resolved = cache.resolve_all(&terms, service, aspect);
    info!(
        "Closing annotations of {} proteins over {} distinct terms ({} newly resolved)",
        annotations.len(),
        terms.len(),
        resolved
    );

    let ancestors: HashMap<GoTermId, TermGroup> = terms
        .iter()
        .map(|term| (term, cache.get_or_resolve(term, service, aspect)))
        .collect();

    let proteins = annotations
        .into_inner()
        .into_par_iter()
        .map(|(protein, direct)| {
            let mut closed = direct.clone();
            for term in &direct {
                if let Some(group) = ancestors.get(&term) {
                    closed.extend_from(group);
                }
            }
            (protein, closed)
        })
        .collect();

    ClosedAnnotationMap::from_closed(proteins)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::term::GoTerm;
    use crate::ProteinId;

    // 1 <- 2 <- 3 <- 4 and 1 <- 5, all molecular function
    // 10 is a cellular component ancestor of 4
    fn table() -> crate::TermTable {
        let mut table = crate::TermTable::default();
        for id in 1u32..=5 {
            table.insert_term(GoTerm::new(id.into(), Aspect::MolecularFunction, "mf"));
        }
        table.insert_term(GoTerm::new(10u32.into(), Aspect::CellularComponent, "cc"));
        for (term, ancestor) in [(2, 1), (3, 2), (3, 1), (4, 3), (4, 2), (4, 1), (5, 1), (4, 10)] {
            table.add_ancestor(GoTermId::from(term as u32), GoTermId::from(ancestor as u32));
        }
        table
    }

    fn annotations() -> AnnotationMap {
        let mut map = AnnotationMap::new();
        map.add_annotation("A".into(), 4u32.into());
        map.add_annotation("B".into(), 5u32.into());
        map.add_annotation("B".into(), 2u32.into());
        map.add_protein("C".into());
        map
    }

    fn ids(map: &ClosedAnnotationMap, protein: &str) -> Vec<u32> {
        map.get(&ProteinId::from(protein))
            .unwrap()
            .iter()
            .map(|id| id.as_u32())
            .collect()
    }

    #[test]
    fn closure_adds_ancestors() {
        let closed = close(annotations(), &AncestorCache::new(), &table(), Aspect::MolecularFunction);
        assert_eq!(ids(&closed, "A"), vec![1, 2, 3, 4]);
        assert_eq!(ids(&closed, "B"), vec![1, 2, 5]);
        assert!(ids(&closed, "C").is_empty());
        assert_eq!(closed.len(), 3);
    }

    #[test]
    fn closure_is_monotonic() {
        let direct = annotations();
        let closed = close(direct.clone(), &AncestorCache::new(), &table(), Aspect::MolecularFunction);
        for (protein, terms) in direct.iter() {
            assert!(terms.is_subset(closed.get(protein).unwrap()));
        }
    }

    #[test]
    fn closure_is_idempotent() {
        let table = table();
        let cache = AncestorCache::new();
        let once = close(annotations(), &cache, &table, Aspect::MolecularFunction);

        let mut reopened = AnnotationMap::new();
        for (protein, terms) in once.iter() {
            reopened.insert(protein.clone(), terms.clone());
        }
        let twice = close(reopened, &cache, &table, Aspect::MolecularFunction);

        assert_eq!(once.len(), twice.len());
        for (protein, terms) in once.iter() {
            assert_eq!(twice.get(protein).unwrap(), terms);
        }
    }

    #[test]
    fn cache_is_reused() {
        let table = table();
        let cache = AncestorCache::new();
        close(annotations(), &cache, &table, Aspect::MolecularFunction);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(4u32.into()).unwrap().len(), 3);
    }

    #[test]
    fn unresolvable_terms_keep_direct_annotations() {
        let mut map = AnnotationMap::new();
        map.add_annotation("X".into(), 77u32.into());
        let closed = close(map, &AncestorCache::new(), &table(), Aspect::MolecularFunction);
        assert_eq!(ids(&closed, "X"), vec![77]);
    }
}
