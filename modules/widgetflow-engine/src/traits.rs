//! Seams between the runtime and the component / view layer.

use std::sync::Arc;

use anyhow::Result;
use widgetflow_common::ActionType;

use crate::engine::Dispatcher;

/// A state record updated by whole-field replacement.
///
/// `Delta` is the partial record a reducer returns; every `Some` field
/// replaces the corresponding field, everything else is carried over.
pub trait Merge: Clone + Send + Sync + 'static {
    type Delta: Send + 'static;

    fn merge(&self, delta: Self::Delta) -> Self;
}

/// The external view layer. Called with every published snapshot.
pub trait Renderer<S: Merge, A: ActionType>: Send + Sync {
    fn render(&self, snapshot: &Arc<S>, dispatch: &Dispatcher<S, A>) -> Result<()>;
}

impl<S, A, R> Renderer<S, A> for Arc<R>
where
    S: Merge,
    A: ActionType,
    R: Renderer<S, A> + ?Sized,
{
    fn render(&self, snapshot: &Arc<S>, dispatch: &Dispatcher<S, A>) -> Result<()> {
        (**self).render(snapshot, dispatch)
    }
}

/// Adapts a closure into a [`Renderer`].
pub struct RenderFn<F>(pub F);

impl<S, A, F> Renderer<S, A> for RenderFn<F>
where
    S: Merge,
    A: ActionType,
    F: Fn(&Arc<S>, &Dispatcher<S, A>) -> Result<()> + Send + Sync,
{
    fn render(&self, snapshot: &Arc<S>, dispatch: &Dispatcher<S, A>) -> Result<()> {
        (self.0)(snapshot, dispatch)
    }
}
