//! Statistical analyses of GO annotations within protein clusters
//!
//! [`hypergeom`] tests every term of a cluster for over-representation
//! compared to the whole annotated background, [`correction`] adjusts the
//! resulting p-values of one cluster for multiple testing.

use std::collections::HashMap;

use crate::{GoTermId, TermGroup};

pub mod correction;
pub mod hypergeom;

/// Per-term protein counts of a set of proteins
///
/// Only annotated proteins, i.e. proteins with at least one term,
/// are part of the set.
#[derive(Debug, Default)]
struct SampleSet {
    /// The number of annotated proteins in the set
    size: u64,
    /// The number of proteins carrying each term
    counts: HashMap<GoTermId, u64>,
}

fn calculate_counts<'a, I: IntoIterator<Item = &'a TermGroup>>(
    groups: I,
) -> (u64, HashMap<GoTermId, u64>) {
    let mut size = 0u64;
    let mut counts: HashMap<GoTermId, u64> = HashMap::new();
    for terms in groups {
        if terms.is_empty() {
            continue;
        }
        size += 1;
        for term in terms {
            counts
                .entry(term)
                .and_modify(|count| *count += 1)
                .or_insert(1);
        }
    }
    (size, counts)
}

impl SampleSet {
    /// Constructs a new [`SampleSet`] from the term sets of the proteins
    fn new<'a, I: IntoIterator<Item = &'a TermGroup>>(groups: I) -> Self {
        let (size, counts) = calculate_counts(groups);
        Self { size, counts }
    }

    /// Returns the number of annotated proteins in the [`SampleSet`]
    fn len(&self) -> u64 {
        self.size
    }

    /// Returns `true` if the set has no annotated protein
    fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The number of proteins in the set that carry the term
    ///
    /// Returns `None` if no protein carries it
    fn get(&self, term: &GoTermId) -> Option<u64> {
        self.counts.get(term).copied()
    }

    /// All terms with their counts, sorted by term
    fn sorted_counts(&self) -> Vec<(GoTermId, u64)> {
        let mut counts: Vec<(GoTermId, u64)> =
            self.counts.iter().map(|(term, count)| (*term, *count)).collect();
        counts.sort_unstable_by_key(|(term, _)| *term);
        counts
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn group(ids: &[u32]) -> TermGroup {
        ids.iter().map(|id| GoTermId::from(*id)).collect()
    }

    #[test]
    fn counts_skip_unannotated() {
        let groups = vec![group(&[1, 2]), group(&[]), group(&[2, 3]), group(&[2])];
        let set = SampleSet::new(&groups);
        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
        assert_eq!(set.get(&1u32.into()), Some(1));
        assert_eq!(set.get(&2u32.into()), Some(3));
        assert_eq!(set.get(&4u32.into()), None);
    }

    #[test]
    fn sorted_counts() {
        let groups = vec![group(&[9, 2]), group(&[5, 2])];
        let counts = SampleSet::new(&groups).sorted_counts();
        let terms: Vec<u32> = counts.iter().map(|(term, _)| term.as_u32()).collect();
        assert_eq!(terms, vec![2, 5, 9]);
        assert_eq!(counts[0].1, 2);
    }

    #[test]
    fn empty_set() {
        let groups: Vec<TermGroup> = vec![TermGroup::new()];
        assert!(SampleSet::new(&groups).is_empty());
    }
}
