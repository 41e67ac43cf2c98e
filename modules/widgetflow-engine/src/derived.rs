//! Computed fields, recomputed eagerly after every commit.

use crate::traits::Merge;

type ComputeFn<S> = Box<dyn Fn(&S) -> <S as Merge>::Delta + Send + Sync>;

struct DerivedField<S: Merge> {
    name: &'static str,
    compute: ComputeFn<S>,
}

/// Ordered list of computed fields for one component.
///
/// Each field is a pure function of state returning a delta that touches only
/// that field. Fields are applied in declaration order, so a later field may
/// read an earlier one.
pub struct DerivedFields<S: Merge> {
    fields: Vec<DerivedField<S>>,
}

impl<S: Merge> Default for DerivedFields<S> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<S: Merge> DerivedFields<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        name: &'static str,
        compute: impl Fn(&S) -> S::Delta + Send + Sync + 'static,
    ) -> Self {
        self.push(name, compute);
        self
    }

    pub fn push(
        &mut self,
        name: &'static str,
        compute: impl Fn(&S) -> S::Delta + Send + Sync + 'static,
    ) {
        self.fields.push(DerivedField {
            name,
            compute: Box::new(compute),
        });
    }

    /// Append `other`'s fields after the ones already declared.
    pub fn extend(&mut self, other: DerivedFields<S>) {
        self.fields.extend(other.fields);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Recompute every field against `state` and merge the results back.
    pub fn apply(&self, state: S) -> S {
        self.fields.iter().fold(state, |state, field| {
            let delta = (field.compute)(&state);
            state.merge(delta)
        })
    }
}
