use std::collections::HashSet;
use std::ops::BitOr;

use smallvec::SmallVec;

use crate::{GoTermId, DEFAULT_NUM_TERMS};

/// A set of [`GoTermId`]s
///
/// Each term can occur only once in the group and the terms are always
/// kept sorted, so iteration order is deterministic.
///
/// The group is used for the annotations of a single protein and for
/// the ancestors of a single term.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TermGroup {
    ids: SmallVec<[GoTermId; DEFAULT_NUM_TERMS]>,
}

impl TermGroup {
    /// Constructs a new, empty [`TermGroup`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a new, empty [`TermGroup`] with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: SmallVec::with_capacity(capacity),
        }
    }

    /// Returns `true` if the group contains no [`GoTermId`]s
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the number of [`GoTermId`]s in the group
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Adds a new [`GoTermId`] to the group
    ///
    /// Returns whether the `GoTermId` was newly inserted. That is:
    ///
    /// - If the group did not previously contain this `GoTermId`, true is returned.
    /// - If the group already contained this `GoTermId`, false is returned.
    pub fn insert<I: Into<GoTermId>>(&mut self, id: I) -> bool {
        let id = id.into();
        match self.ids.binary_search(&id) {
            Ok(_) => false,
            Err(idx) => {
                self.ids.insert(idx, id);
                true
            }
        }
    }

    /// Appends without checking order or uniqueness
    ///
    /// Callers must only push ids larger than the current last one
    fn insert_unchecked(&mut self, id: GoTermId) {
        self.ids.push(id);
    }

    /// Removes the [`GoTermId`] from the group
    ///
    /// Returns whether the `GoTermId` was present
    pub fn remove(&mut self, id: &GoTermId) -> bool {
        match self.ids.binary_search(id) {
            Ok(idx) => {
                self.ids.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    /// Returns `true` if the group contains the [`GoTermId`]
    pub fn contains(&self, id: &GoTermId) -> bool {
        self.ids.binary_search(id).is_ok()
    }

    /// Returns `true` if every term of `self` is also in `other`
    pub fn is_subset(&self, other: &TermGroup) -> bool {
        self.ids.iter().all(|id| other.contains(id))
    }

    /// Returns an Iterator of the [`GoTermId`]s inside the group
    pub fn iter(&self) -> TermIds<'_> {
        TermIds::new(self.ids.iter())
    }

    /// Adds every term of `other` to the group
    pub fn extend_from(&mut self, other: &TermGroup) {
        if other.is_empty() {
            return;
        }
        *self = &*self | other;
    }
}

impl From<HashSet<GoTermId>> for TermGroup {
    fn from(s: HashSet<GoTermId>) -> Self {
        let mut ids: Vec<GoTermId> = s.into_iter().collect();
        ids.sort_unstable();
        let mut group = TermGroup::with_capacity(ids.len());
        for id in ids {
            group.insert_unchecked(id);
        }
        group
    }
}

impl From<Vec<GoTermId>> for TermGroup {
    fn from(mut ids: Vec<GoTermId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        let mut group = TermGroup::with_capacity(ids.len());
        for id in ids {
            group.insert_unchecked(id);
        }
        group
    }
}

impl FromIterator<GoTermId> for TermGroup {
    fn from_iter<T: IntoIterator<Item = GoTermId>>(iter: T) -> Self {
        TermGroup::from(iter.into_iter().collect::<Vec<GoTermId>>())
    }
}

impl<'a> IntoIterator for &'a TermGroup {
    type Item = GoTermId;
    type IntoIter = TermIds<'a>;

    fn into_iter(self) -> TermIds<'a> {
        TermIds::new(self.ids.iter())
    }
}

/// An iterator over [`GoTermId`]s
pub struct TermIds<'a> {
    inner: std::slice::Iter<'a, GoTermId>,
}

impl<'a> TermIds<'a> {
    fn new(inner: std::slice::Iter<'a, GoTermId>) -> Self {
        Self { inner }
    }
}

impl Iterator for TermIds<'_> {
    type Item = GoTermId;
    fn next(&mut self) -> Option<GoTermId> {
        self.inner.next().copied()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl BitOr for &TermGroup {
    type Output = TermGroup;

    /// Merges both sorted groups in a single pass
    fn bitor(self, rhs: &TermGroup) -> TermGroup {
        let mut group = TermGroup::with_capacity(self.len() + rhs.len());
        let mut left = self.ids.iter().peekable();
        let mut right = rhs.ids.iter().peekable();
        loop {
            let next = match (left.peek().copied(), right.peek().copied()) {
                (Some(l), Some(r)) if l < r => left.next(),
                (Some(l), Some(r)) if l > r => right.next(),
                (Some(_), Some(_)) => {
                    right.next();
                    left.next()
                }
                (Some(_), None) => left.next(),
                (None, Some(_)) => right.next(),
                (None, None) => break,
            };
            if let Some(id) = next {
                group.insert_unchecked(*id);
            }
        }
        group
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn group(ids: &[u32]) -> TermGroup {
        ids.iter().map(|id| GoTermId::from(*id)).collect()
    }

    fn ids(group: &TermGroup) -> Vec<u32> {
        group.iter().map(|id| id.as_u32()).collect()
    }

    #[test]
    fn insert_keeps_order_and_uniqueness() {
        let mut group = TermGroup::new();
        assert!(group.insert(3u32));
        assert!(group.insert(1u32));
        assert!(group.insert(2u32));
        assert!(!group.insert(1u32));
        assert_eq!(ids(&group), vec![1, 2, 3]);
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn remove() {
        let mut group = group(&[1, 2]);
        assert!(group.remove(&1u32.into()));
        assert!(!group.remove(&1u32.into()));
        assert_eq!(ids(&group), vec![2]);
    }

    #[test]
    fn from_iter_deduplicates() {
        assert_eq!(ids(&group(&[5, 1, 5])), vec![1, 5]);
    }

    #[test]
    fn from_hashset() {
        let set: HashSet<GoTermId> = [9u32, 3, 6].into_iter().map(GoTermId::from).collect();
        assert_eq!(ids(&TermGroup::from(set)), vec![3, 6, 9]);
    }

    #[test]
    fn bitor() {
        let result = &group(&[1, 2, 3]) | &group(&[1, 2, 4, 5]);
        assert_eq!(ids(&result), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn bitor_empty() {
        let group1 = group(&[7]);
        let result = &group1 | &TermGroup::new();
        assert_eq!(result, group1);
    }

    #[test]
    fn subset() {
        let small = group(&[2]);
        let large = group(&[1, 2]);
        assert!(small.is_subset(&large));
        assert!(!large.is_subset(&small));
        assert!(TermGroup::new().is_subset(&small));
    }

    #[test]
    fn extend_from() {
        let mut terms = group(&[3]);
        terms.extend_from(&group(&[1, 3]));
        assert_eq!(ids(&terms), vec![1, 3]);
    }
}
