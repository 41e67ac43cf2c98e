//! Action tag → ordered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use widgetflow_common::{Action, ActionType};

use crate::effects::Effect;
use crate::engine::Dispatcher;
use crate::persist::Storage;
use crate::traits::Merge;

/// Synchronous handler. Returns `Some(delta)` to commit, `None` for no change.
pub type ReducerFn<S, A> =
    Arc<dyn Fn(&ReducerContext<'_, S, A>) -> Result<Option<<S as Merge>::Delta>> + Send + Sync>;

pub enum Handler<S: Merge, A: ActionType> {
    Reducer(ReducerFn<S, A>),
    Effect(Arc<Effect<S, A>>),
}

impl<S: Merge, A: ActionType> Clone for Handler<S, A> {
    fn clone(&self) -> Self {
        match self {
            Handler::Reducer(f) => Handler::Reducer(f.clone()),
            Handler::Effect(e) => Handler::Effect(e.clone()),
        }
    }
}

impl<S: Merge, A: ActionType> Handler<S, A> {
    pub fn is_effect(&self) -> bool {
        matches!(self, Handler::Effect(_))
    }
}

/// What a reducer sees: the snapshot left by the previous handler, the
/// action, and a dispatcher whose actions are queued behind this one.
pub struct ReducerContext<'a, S: Merge, A: ActionType> {
    pub state: &'a S,
    pub action: &'a Action<A>,
    dispatcher: &'a Dispatcher<S, A>,
    storage: Option<&'a dyn Storage>,
}

impl<'a, S: Merge, A: ActionType> ReducerContext<'a, S, A> {
    pub(crate) fn new(
        state: &'a S,
        action: &'a Action<A>,
        dispatcher: &'a Dispatcher<S, A>,
        storage: Option<&'a dyn Storage>,
    ) -> Self {
        Self {
            state,
            action,
            dispatcher,
            storage,
        }
    }

    /// Queue a follow-up action. It runs after every remaining handler of the
    /// current action.
    pub fn dispatch(&self, kind: A) -> bool {
        self.dispatcher.dispatch(kind)
    }

    pub fn dispatch_action(&self, action: Action<A>) -> bool {
        self.dispatcher.dispatch_action(action)
    }

    pub fn dispatcher(&self) -> &Dispatcher<S, A> {
        self.dispatcher
    }

    pub fn storage(&self) -> Option<&'a dyn Storage> {
        self.storage
    }
}

/// Handlers keyed by action tag, kept in registration order.
pub struct HandlerRegistry<S: Merge, A: ActionType> {
    handlers: HashMap<A::Tag, Vec<Handler<S, A>>>,
}

impl<S: Merge, A: ActionType> Default for HandlerRegistry<S, A> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<S: Merge, A: ActionType> HandlerRegistry<S, A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reducer<F>(&mut self, tag: A::Tag, f: F) -> &mut Self
    where
        F: Fn(&ReducerContext<'_, S, A>) -> Result<Option<S::Delta>> + Send + Sync + 'static,
    {
        self.handlers
            .entry(tag)
            .or_default()
            .push(Handler::Reducer(Arc::new(f)));
        self
    }

    pub fn effect(&mut self, tag: A::Tag, effect: Effect<S, A>) -> &mut Self {
        self.handlers
            .entry(tag)
            .or_default()
            .push(Handler::Effect(Arc::new(effect)));
        self
    }

    /// Handlers for `tag` in registration order. Empty when none registered.
    pub fn resolve(&self, tag: A::Tag) -> &[Handler<S, A>] {
        self.handlers.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
