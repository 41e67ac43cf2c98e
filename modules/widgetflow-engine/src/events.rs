//! Raw view events and reusable behaviors.
//!
//! The view layer calls [`Instance::handle_event`](crate::Instance::handle_event)
//! with an event name and a JSON payload; the handlers registered for that
//! name translate it into dispatches. A [`Behavior`] is a named bundle of such
//! handlers that several components can share.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use widgetflow_common::{Action, ActionType};

use crate::engine::Dispatcher;
use crate::traits::Merge;

pub type EventFn<S, A> = Arc<dyn Fn(&EventContext<'_, S, A>) -> Result<()> + Send + Sync>;

pub struct EventContext<'a, S: Merge, A: ActionType> {
    pub event: &'a str,
    pub payload: &'a serde_json::Value,
    pub state: &'a S,
    dispatcher: &'a Dispatcher<S, A>,
}

impl<'a, S: Merge, A: ActionType> EventContext<'a, S, A> {
    pub(crate) fn new(
        event: &'a str,
        payload: &'a serde_json::Value,
        state: &'a S,
        dispatcher: &'a Dispatcher<S, A>,
    ) -> Self {
        Self {
            event,
            payload,
            state,
            dispatcher,
        }
    }

    pub fn dispatch(&self, kind: A) -> bool {
        self.dispatcher.dispatch(kind)
    }

    pub fn dispatch_action(&self, action: Action<A>) -> bool {
        self.dispatcher.dispatch_action(action)
    }
}

pub(crate) struct EventHandler<S: Merge, A: ActionType> {
    pub(crate) origin: Option<&'static str>,
    pub(crate) run: EventFn<S, A>,
}

impl<S: Merge, A: ActionType> Clone for EventHandler<S, A> {
    fn clone(&self) -> Self {
        Self {
            origin: self.origin,
            run: self.run.clone(),
        }
    }
}

pub(crate) struct EventHandlers<S: Merge, A: ActionType> {
    handlers: HashMap<String, Vec<EventHandler<S, A>>>,
}

impl<S: Merge, A: ActionType> Default for EventHandlers<S, A> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<S: Merge, A: ActionType> EventHandlers<S, A> {
    pub(crate) fn add(&mut self, event: &str, origin: Option<&'static str>, run: EventFn<S, A>) {
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push(EventHandler { origin, run });
    }

    pub(crate) fn resolve(&self, event: &str) -> &[EventHandler<S, A>] {
        self.handlers.get(event).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A named set of event handlers, attached with
/// [`InstanceBuilder::behavior`](crate::InstanceBuilder::behavior).
pub struct Behavior<S: Merge, A: ActionType> {
    name: &'static str,
    handlers: Vec<(Vec<&'static str>, EventFn<S, A>)>,
}

impl<S: Merge, A: ActionType> Behavior<S, A> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: Vec::new(),
        }
    }

    /// Handle every event in `events` with `f`.
    pub fn on<F>(mut self, events: &[&'static str], f: F) -> Self
    where
        F: Fn(&EventContext<'_, S, A>) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers.push((events.to_vec(), Arc::new(f)));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn install(self, into: &mut EventHandlers<S, A>) {
        for (events, run) in self.handlers {
            for event in events {
                into.add(event, Some(self.name), run.clone());
            }
        }
    }
}
