//! Current snapshot for one instance.

use std::sync::{Arc, PoisonError, RwLock};

use crate::derived::DerivedFields;
use crate::traits::Merge;

/// Holds the published snapshot. Snapshots are `Arc`s and never mutated once
/// handed out; a commit always publishes a fresh one.
pub struct StateStore<S: Merge> {
    current: RwLock<Arc<S>>,
    derived: DerivedFields<S>,
}

impl<S: Merge> StateStore<S> {
    /// Computed fields are evaluated against the initial state too.
    pub fn new(initial: S, derived: DerivedFields<S>) -> Self {
        let initial = derived.apply(initial);
        Self {
            current: RwLock::new(Arc::new(initial)),
            derived,
        }
    }

    pub fn snapshot(&self) -> Arc<S> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merge `delta`, refresh computed fields, publish and return the result.
    ///
    /// Only the engine calls this, from inside the queue's handling window.
    pub(crate) fn commit(&self, delta: S::Delta) -> Arc<S> {
        let base = self.snapshot();
        let next = Arc::new(self.derived.apply(base.merge(delta)));
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next.clone();
        next
    }

    pub fn derived_fields(&self) -> Vec<&'static str> {
        self.derived.names()
    }
}
