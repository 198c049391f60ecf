//! Access to the Gene Ontology graph
//!
//! The enrichment only needs two things from the ontology: the ancestors
//! of a term and the name of a term. Both are provided by an
//! [`OntologyService`]. This crate ships [`TermTable`], an in-memory
//! service loaded from files. Remote services can be plugged in by
//! implementing the trait and wrapping them in [`Retrying`].
//!
//! Ancestor lookups are memoized in an [`AncestorCache`] that lives for
//! one pipeline run.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::{Aspect, GoResult, GoTermId, TermGroup};

mod table;
pub use table::TermTable;

/// Capability to query the Gene Ontology
///
/// Implementors decide about transport, timeouts and caching of
/// their own. The analysis only distinguishes between a successful
/// answer (which can be empty) and a failure.
pub trait OntologyService: Sync {
    /// Returns all ancestors of `term` that belong to `aspect`
    ///
    /// The ancestors must already be transitively closed, i.e. include
    /// the parents of the parents and so on.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GoError::Resolution`] if the service cannot answer
    fn resolve_ancestors(&self, term: GoTermId, aspect: Aspect) -> GoResult<TermGroup>;

    /// Returns the human-readable name of `term`
    ///
    /// Returns `Ok(None)` if the service does not know the term
    ///
    /// # Errors
    ///
    /// Returns [`crate::GoError::Resolution`] if the service cannot answer
    fn resolve_name(&self, term: GoTermId) -> GoResult<Option<String>>;
}

impl<T: OntologyService> OntologyService for &T {
    fn resolve_ancestors(&self, term: GoTermId, aspect: Aspect) -> GoResult<TermGroup> {
        (*self).resolve_ancestors(term, aspect)
    }

    fn resolve_name(&self, term: GoTermId) -> GoResult<Option<String>> {
        (*self).resolve_name(term)
    }
}

/// Retries failed requests of the inner [`OntologyService`]
///
/// Every request is attempted at most `max_attempts` times. The error
/// of the last attempt is returned if all of them fail.
#[derive(Debug, Clone)]
pub struct Retrying<S> {
    inner: S,
    max_attempts: usize,
}

impl<S: OntologyService> Retrying<S> {
    /// Wraps `inner`, trying each request up to `max_attempts` times
    ///
    /// `max_attempts` of `0` is treated as `1`
    pub fn new(inner: S, max_attempts: usize) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
        }
    }

    /// The wrapped service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn attempt<T, F: Fn() -> GoResult<T>>(&self, term: GoTermId, request: F) -> GoResult<T> {
        let mut attempt = 1;
        loop {
            match request() {
                Ok(res) => return Ok(res),
                Err(err) if attempt >= self.max_attempts => return Err(err),
                Err(err) => {
                    debug!("Attempt {}/{} for {} failed: {}", attempt, self.max_attempts, term, err);
                    attempt += 1;
                }
            }
        }
    }
}

impl<S: OntologyService> OntologyService for Retrying<S> {
    fn resolve_ancestors(&self, term: GoTermId, aspect: Aspect) -> GoResult<TermGroup> {
        self.attempt(term, || self.inner.resolve_ancestors(term, aspect))
    }

    fn resolve_name(&self, term: GoTermId) -> GoResult<Option<String>> {
        self.attempt(term, || self.inner.resolve_name(term))
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Append-only cache of the ancestors of GO terms
///
/// Each term is resolved at most once per cache, even when many
/// threads ask for it at the same time: the first caller resolves it
/// while all others wait for that result.
///
/// A term that has no ancestors, or whose resolution failed, is stored
/// with an empty set and is never resolved again.
///
/// ```mermaid
/// graph LR
///     A[term] --> B{cached?}
///     B -- yes --> C[ancestors]
///     B -- no --> D[OntologyService::resolve_ancestors]
///     D -- Ok --> E[drop term itself] --> F[store] --> C
///     D -- Err --> G[store empty set] --> C
/// ```
///
/// # Examples
///
/// ```
/// use gbsc_enrich::{AncestorCache, Aspect, GoTermId, TermTable};
/// use gbsc_enrich::term::GoTerm;
///
/// let mut table = TermTable::default();
/// table.insert_term(GoTerm::new(1u32.into(), Aspect::MolecularFunction, "root"));
/// table.insert_term(GoTerm::new(2u32.into(), Aspect::MolecularFunction, "child"));
/// table.add_ancestor(2u32.into(), 1u32.into());
///
/// let cache = AncestorCache::default();
/// let ancestors = cache.get_or_resolve(2u32.into(), &table, Aspect::MolecularFunction);
/// assert!(ancestors.contains(&GoTermId::from(1u32)));
/// assert_eq!(cache.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct AncestorCache {
    terms: Mutex<HashMap<GoTermId, Arc<OnceLock<TermGroup>>>>,
}

impl AncestorCache {
    /// Constructs a new, empty [`AncestorCache`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of resolved terms
    pub fn len(&self) -> usize {
        self.lock().values().filter(|cell| cell.get().is_some()).count()
    }

    /// Returns `true` if no term was resolved yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached ancestors of `term`
    ///
    /// Returns `None` if the term was not resolved yet
    pub fn get(&self, term: GoTermId) -> Option<TermGroup> {
        self.lock().get(&term).and_then(|cell| cell.get().cloned())
    }

    /// Returns `true` if the ancestors of the term are known
    pub fn contains(&self, term: GoTermId) -> bool {
        self.get(term).is_some()
    }

    /// Stores the ancestors of `term`, unless they are known already
    ///
    /// Returns whether the ancestors were stored
    pub fn insert(&self, term: GoTermId, mut ancestors: TermGroup) -> bool {
        ancestors.remove(&term);
        self.cell(term).set(ancestors).is_ok()
    }

    /// Returns the ancestors of `term`, resolving them via `service` if needed
    ///
    /// Failures of the service are logged and result in an empty set
    pub fn get_or_resolve<S: OntologyService>(
        &self,
        term: GoTermId,
        service: &S,
        aspect: Aspect,
    ) -> TermGroup {
        self.cell(term)
            .get_or_init(|| match service.resolve_ancestors(term, aspect) {
                Ok(mut ancestors) => {
                    ancestors.remove(&term);
                    debug!("Resolved {} ancestors for {}", ancestors.len(), term);
                    ancestors
                }
                Err(err) => {
                    info!("Lack of GO ancestor info for {}: {}", term, err);
                    TermGroup::new()
                }
            })
            .clone()
    }

    /// Resolves all `terms` that are not cached yet, in parallel
    ///
    /// Returns the number of terms that had to be resolved
    pub fn resolve_all<S: OntologyService>(
        &self,
        terms: &TermGroup,
        service: &S,
        aspect: Aspect,
    ) -> usize {
        let missing: Vec<GoTermId> = terms.iter().filter(|term| !self.contains(*term)).collect();
        info!("Resolving ancestors of {} uncached terms", missing.len());
        missing.par_iter().for_each(|term| {
            self.get_or_resolve(*term, service, aspect);
        });
        missing.len()
    }

    fn cell(&self, term: GoTermId) -> Arc<OnceLock<TermGroup>> {
        Arc::clone(self.lock().entry(term).or_default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<GoTermId, Arc<OnceLock<TermGroup>>>> {
        self.terms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::GoError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` requests, then returns the term's successor
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl OntologyService for Flaky {
        fn resolve_ancestors(&self, term: GoTermId, _: Aspect) -> GoResult<TermGroup> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(GoError::Resolution("service unavailable".to_string()));
            }
            let mut group = TermGroup::new();
            group.insert(term.as_u32() + 1);
            group.insert(term);
            Ok(group)
        }

        fn resolve_name(&self, _: GoTermId) -> GoResult<Option<String>> {
            Err(GoError::Resolution("service unavailable".to_string()))
        }
    }

    #[test]
    fn retry_until_success() {
        let service = Retrying::new(Flaky::new(2), 3);
        let ancestors = service
            .resolve_ancestors(1u32.into(), Aspect::MolecularFunction)
            .unwrap();
        assert!(ancestors.contains(&2u32.into()));
        assert_eq!(service.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn retry_is_bounded() {
        let service = Retrying::new(Flaky::new(5), 3);
        assert!(service
            .resolve_ancestors(1u32.into(), Aspect::MolecularFunction)
            .is_err());
        assert_eq!(service.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_resolution_is_cached_as_empty() {
        let service = Flaky::new(1);
        let cache = AncestorCache::new();
        let ancestors = cache.get_or_resolve(1u32.into(), &service, Aspect::MolecularFunction);
        assert!(ancestors.is_empty());

        // the service would answer now, but the empty set is definitive
        let ancestors = cache.get_or_resolve(1u32.into(), &service, Aspect::MolecularFunction);
        assert!(ancestors.is_empty());
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn term_itself_is_not_an_ancestor() {
        let cache = AncestorCache::new();
        let ancestors = cache.get_or_resolve(7u32.into(), &Flaky::new(0), Aspect::MolecularFunction);
        assert_eq!(ancestors.len(), 1);
        assert!(!ancestors.contains(&7u32.into()));
    }

    #[test]
    fn resolve_all_queries_each_term_once() {
        let service = Flaky::new(0);
        let cache = AncestorCache::new();
        let terms: TermGroup = (1u32..=50).map(GoTermId::from).collect();

        assert_eq!(cache.resolve_all(&terms, &service, Aspect::MolecularFunction), 50);
        assert_eq!(cache.resolve_all(&terms, &service, Aspect::MolecularFunction), 0);
        assert_eq!(service.calls.load(Ordering::SeqCst), 50);
        assert_eq!(cache.len(), 50);
    }

    /// Takes its time to answer and counts the requests
    struct Slow {
        calls: AtomicUsize,
    }

    impl OntologyService for Slow {
        fn resolve_ancestors(&self, term: GoTermId, _: Aspect) -> GoResult<TermGroup> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(50));
            let mut group = TermGroup::new();
            group.insert(term.as_u32() + 1);
            Ok(group)
        }

        fn resolve_name(&self, _: GoTermId) -> GoResult<Option<String>> {
            Ok(None)
        }
    }

    #[test]
    fn competing_callers_resolve_once() {
        let service = Slow {
            calls: AtomicUsize::new(0),
        };
        let cache = AncestorCache::new();
        let term = GoTermId::from(7u32);

        let results: Vec<TermGroup> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| cache.get_or_resolve(term, &service, Aspect::MolecularFunction)))
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.len(), 16);
        assert!(results.iter().all(|ancestors| ancestors.contains(&8u32.into())));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn insert_is_append_only() {
        let cache = AncestorCache::new();
        let first: TermGroup = [2u32].into_iter().map(GoTermId::from).collect();
        let second: TermGroup = [3u32].into_iter().map(GoTermId::from).collect();
        assert!(cache.insert(1u32.into(), first.clone()));
        assert!(!cache.insert(1u32.into(), second));
        assert_eq!(cache.get(1u32.into()), Some(first));
        assert!(cache.get(2u32.into()).is_none());
    }
}
