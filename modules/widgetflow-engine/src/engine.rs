//! The dispatch loop.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;
use widgetflow_common::{Action, ActionType, ErrorLocation, ErrorReport, FlowError, Lifecycle};

use crate::derived::DerivedFields;
use crate::effects::{panic_message, Effect, EffectExecutor};
use crate::events::{Behavior, EventContext, EventHandlers};
use crate::journal::{ActionSink, RecordedAction};
use crate::persist::{Persistence, Storage};
use crate::registry::{Handler, HandlerRegistry, ReducerContext};
use crate::store::StateStore;
use crate::traits::{Merge, Renderer};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Declares a component instance: initial state, computed fields, handlers,
/// view, storage.
pub struct InstanceBuilder<S: Merge, A: ActionType> {
    name: String,
    initial: S,
    derived: DerivedFields<S>,
    registry: HandlerRegistry<S, A>,
    events: EventHandlers<S, A>,
    renderer: Option<Box<dyn Renderer<S, A>>>,
    storage: Option<Arc<dyn Storage>>,
    persistence: Option<Persistence<S>>,
    sink: Option<Arc<dyn ActionSink>>,
}

impl<S: Merge, A: ActionType> InstanceBuilder<S, A> {
    pub fn new(name: impl Into<String>, initial: S) -> Self {
        Self {
            name: name.into(),
            initial,
            derived: DerivedFields::new(),
            registry: HandlerRegistry::new(),
            events: EventHandlers::default(),
            renderer: None,
            storage: None,
            persistence: None,
            sink: None,
        }
    }

    pub fn computed(
        mut self,
        name: &'static str,
        compute: impl Fn(&S) -> S::Delta + Send + Sync + 'static,
    ) -> Self {
        self.derived.push(name, compute);
        self
    }

    /// Add a prepared set of computed fields after any declared so far.
    pub fn derived(mut self, fields: DerivedFields<S>) -> Self {
        self.derived.extend(fields);
        self
    }

    pub fn reducer<F>(mut self, tag: A::Tag, f: F) -> Self
    where
        F: Fn(&ReducerContext<'_, S, A>) -> anyhow::Result<Option<S::Delta>>
            + Send
            + Sync
            + 'static,
    {
        self.registry.reducer(tag, f);
        self
    }

    pub fn effect(mut self, tag: A::Tag, effect: Effect<S, A>) -> Self {
        self.registry.effect(tag, effect);
        self
    }

    pub fn on_event<F>(mut self, event: &str, f: F) -> Self
    where
        F: Fn(&EventContext<'_, S, A>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events.add(event, None, Arc::new(f));
        self
    }

    pub fn behavior(mut self, behavior: Behavior<S, A>) -> Self {
        behavior.install(&mut self.events);
        self
    }

    pub fn renderer(mut self, renderer: impl Renderer<S, A> + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn persist(mut self, persistence: Persistence<S>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn journal(mut self, sink: Arc<dyn ActionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Load persisted state, start the instance and dispatch `Bootstrapped`.
    ///
    /// Must be called from within a tokio runtime; effects are spawned on it.
    pub fn build(self) -> Result<Instance<S, A>, FlowError> {
        let runtime = Handle::try_current().map_err(|_| FlowError::NoRuntime)?;
        let id = Uuid::new_v4();

        let mut initial = self.initial;
        let mut last_persisted = None;
        if let (Some(persistence), Some(storage)) = (&self.persistence, &self.storage) {
            let stored = storage
                .get(persistence.key())
                .map_err(|e| FlowError::Storage(format!("{e:#}")))?;
            if let Some(raw) = stored {
                match persistence.decode(&raw) {
                    Ok(delta) => {
                        initial = initial.merge(delta);
                        last_persisted = Some(raw);
                    }
                    Err(e) => warn!(
                        key = persistence.key(),
                        error = %e,
                        "Ignoring unreadable persisted state"
                    ),
                }
            }
        }

        let inner = Arc::new(Inner {
            id,
            name: self.name,
            store: StateStore::new(initial, self.derived),
            registry: self.registry,
            events: self.events,
            effects: EffectExecutor::new(runtime),
            renderer: self.renderer,
            storage: self.storage,
            persistence: self.persistence,
            last_persisted: Mutex::new(last_persisted),
            sink: self.sink,
            queue: Mutex::new(Queue::default()),
            generation: AtomicU64::new(0),
            destroyed: AtomicBool::new(false),
        });

        info!(
            instance = %id,
            component = inner.name.as_str(),
            handlers = inner.registry.len(),
            computed = ?inner.store.derived_fields(),
            "Instance bootstrapped"
        );

        let instance = Instance { inner };
        instance.dispatch(A::lifecycle(Lifecycle::Bootstrapped));
        Ok(instance)
    }
}

// ---------------------------------------------------------------------------
// Instance
// ---------------------------------------------------------------------------

/// Handle to one running component. Cheap to clone; all clones share state.
pub struct Instance<S: Merge, A: ActionType> {
    inner: Arc<Inner<S, A>>,
}

impl<S: Merge, A: ActionType> Clone for Instance<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Merge, A: ActionType> Instance<S, A> {
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn snapshot(&self) -> Arc<S> {
        self.inner.store.snapshot()
    }

    /// Queue an action. Returns `false` if the instance has been destroyed.
    /// Handler failures never surface here; they come back as actions.
    pub fn dispatch(&self, kind: A) -> bool {
        self.dispatch_action(Action::new(kind))
    }

    pub fn dispatch_action(&self, action: Action<A>) -> bool {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.inner.enqueue(action, None, generation, false)
    }

    /// A dispatcher for the view layer, bound to the current generation.
    pub fn dispatcher(&self) -> Dispatcher<S, A> {
        self.inner.dispatcher(None)
    }

    /// Run the handlers registered for a raw view event.
    pub fn handle_event(&self, event: &str, payload: serde_json::Value) {
        self.inner.handle_event(event, &payload);
    }

    /// Run an effect outside the registry, e.g. from an event handler.
    pub fn run_effect(&self, effect: Arc<Effect<S, A>>, action: Action<A>) {
        if self.is_destroyed() {
            return;
        }
        self.inner.effects.run(
            effect,
            action,
            self.snapshot(),
            self.inner.dispatcher(None),
            self.inner.storage.clone(),
        );
    }

    pub fn in_flight(&self) -> usize {
        self.inner.effects.in_flight()
    }

    /// Resolves once no effect is in flight.
    pub async fn settled(&self) {
        self.inner.effects.settled().await
    }

    /// Tear down: drop queued actions, invalidate every outstanding
    /// dispatcher and fire the effects' cancellation token. In-flight effects
    /// keep running unless they observe the token, but their completions are
    /// discarded.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let dropped = {
            let mut queue = self.inner.lock_queue();
            let dropped = queue.pending.len();
            queue.pending.clear();
            dropped
        };
        self.inner.effects.cancel_all();
        info!(
            instance = %self.inner.id,
            component = self.inner.name.as_str(),
            dropped_actions = dropped,
            in_flight = self.inner.effects.in_flight(),
            "Instance destroyed"
        );
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Dispatch capability handed to reducers, effects, event handlers and the
/// renderer.
///
/// Holds a weak reference plus the generation it was issued under. Once the
/// instance is destroyed or dropped, every dispatch through it is a no-op.
pub struct Dispatcher<S: Merge, A: ActionType> {
    inner: Weak<Inner<S, A>>,
    generation: u64,
    cause: Option<u64>,
}

impl<S: Merge, A: ActionType> Clone for Dispatcher<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            generation: self.generation,
            cause: self.cause,
        }
    }
}

impl<S: Merge, A: ActionType> Dispatcher<S, A> {
    pub fn dispatch(&self, kind: A) -> bool {
        self.dispatch_action(Action::new(kind))
    }

    pub fn dispatch_action(&self, action: Action<A>) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.enqueue(action, self.cause, self.generation, false),
            None => {
                debug!(
                    action = action.kind.type_str(),
                    "Instance dropped, discarding dispatch"
                );
                false
            }
        }
    }

    /// Whether dispatches through this handle still reach the instance.
    pub fn is_live(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.accepts(self.generation))
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct Queued<A> {
    seq: u64,
    action: Action<A>,
    cause: Option<u64>,
    /// Runtime-raised `ErrorThrown`; failures while handling it are only logged.
    reporting: bool,
}

struct Queue<A> {
    pending: VecDeque<Queued<A>>,
    draining: bool,
    next_seq: u64,
}

impl<A> Default for Queue<A> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            draining: false,
            next_seq: 1,
        }
    }
}

struct Inner<S: Merge, A: ActionType> {
    id: Uuid,
    name: String,
    store: StateStore<S>,
    registry: HandlerRegistry<S, A>,
    events: EventHandlers<S, A>,
    effects: EffectExecutor,
    renderer: Option<Box<dyn Renderer<S, A>>>,
    storage: Option<Arc<dyn Storage>>,
    persistence: Option<Persistence<S>>,
    last_persisted: Mutex<Option<String>>,
    sink: Option<Arc<dyn ActionSink>>,
    queue: Mutex<Queue<A>>,
    generation: AtomicU64,
    destroyed: AtomicBool,
}

impl<S: Merge, A: ActionType> Inner<S, A> {
    fn lock_queue(&self) -> MutexGuard<'_, Queue<A>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn accepts(&self, generation: u64) -> bool {
        !self.destroyed.load(Ordering::SeqCst)
            && self.generation.load(Ordering::SeqCst) == generation
    }

    fn dispatcher(self: &Arc<Self>, cause: Option<u64>) -> Dispatcher<S, A> {
        Dispatcher {
            inner: Arc::downgrade(self),
            generation: self.generation.load(Ordering::SeqCst),
            cause,
        }
    }

    /// Append to the FIFO. The first caller to find the queue idle drains it;
    /// everyone else just appends. Both checks happen under the queue lock,
    /// so an append racing with the end of a drain is never stranded.
    fn enqueue(
        self: &Arc<Self>,
        action: Action<A>,
        cause: Option<u64>,
        generation: u64,
        reporting: bool,
    ) -> bool {
        if !self.accepts(generation) {
            debug!(
                instance = %self.id,
                action = action.kind.type_str(),
                "Instance torn down, discarding dispatch"
            );
            return false;
        }

        let start = {
            let mut queue = self.lock_queue();
            let seq = queue.next_seq;
            queue.next_seq += 1;
            queue.pending.push_back(Queued {
                seq,
                action,
                cause,
                reporting,
            });
            if queue.draining {
                false
            } else {
                queue.draining = true;
                true
            }
        };

        if start {
            self.drain();
        }
        true
    }

    fn drain(self: &Arc<Self>) {
        loop {
            let next = {
                let mut queue = self.lock_queue();
                match queue.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        queue.draining = false;
                        return;
                    }
                }
            };

            if self.destroyed.load(Ordering::SeqCst) {
                continue;
            }
            self.process(next);
        }
    }

    /// Run every handler for one action: reducers now, in order, each seeing
    /// the previous one's commit; effects after the last reducer.
    fn process(self: &Arc<Self>, queued: Queued<A>) {
        let Queued {
            seq,
            action,
            cause,
            reporting,
        } = queued;
        let action_type = action.kind.type_str();

        debug!(
            instance = %self.id,
            seq,
            action = action_type,
            caused_by = ?cause,
            is_error = action.is_error,
            "Handling action"
        );

        if let Some(sink) = &self.sink {
            sink.record(RecordedAction {
                seq,
                ts: Utc::now(),
                instance: self.id,
                action_type,
                caused_by: cause,
                is_error: action.is_error,
                meta: action.meta.clone(),
            });
        }

        let handlers = self.registry.resolve(action.kind.tag());
        if handlers.is_empty() {
            trace!(instance = %self.id, action = action_type, "No handlers registered");
            return;
        }

        let dispatcher = self.dispatcher(Some(seq));
        let mut committed = false;
        let mut effects = Vec::new();

        for handler in handlers {
            match handler {
                Handler::Reducer(reduce) => {
                    let state = self.store.snapshot();
                    let ctx =
                        ReducerContext::new(&*state, &action, &dispatcher, self.storage.as_deref());
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        reduce(&ctx).map(|delta| delta.map(|d| self.store.commit(d)))
                    }));

                    match outcome {
                        Ok(Ok(Some(snapshot))) => {
                            committed = true;
                            self.render(&snapshot, &dispatcher, action_type, seq, reporting);
                        }
                        Ok(Ok(None)) => {}
                        Ok(Err(err)) => self.report(
                            ErrorLocation::ActionHandler,
                            action_type,
                            format!("{err:#}"),
                            Some(seq),
                            reporting,
                        ),
                        Err(panic) => self.report(
                            ErrorLocation::ActionHandler,
                            action_type,
                            panic_message(&*panic),
                            Some(seq),
                            reporting,
                        ),
                    }
                }
                Handler::Effect(effect) => effects.push(effect.clone()),
            }
        }

        if committed {
            self.persist(action_type, seq, reporting);
        }

        if !effects.is_empty() {
            let state = self.store.snapshot();
            for effect in effects {
                self.effects.run(
                    effect,
                    action.clone(),
                    state.clone(),
                    dispatcher.clone(),
                    self.storage.clone(),
                );
            }
        }
    }

    fn render(
        self: &Arc<Self>,
        snapshot: &Arc<S>,
        dispatcher: &Dispatcher<S, A>,
        action_type: &'static str,
        seq: u64,
        reporting: bool,
    ) {
        let Some(renderer) = &self.renderer else {
            return;
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| renderer.render(snapshot, dispatcher)));
        let message = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => format!("{err:#}"),
            Err(panic) => panic_message(&*panic),
        };
        self.report(ErrorLocation::Render, action_type, message, Some(seq), reporting);
    }

    /// Write-after-commit. Skipped when the encoded value hasn't changed.
    fn persist(self: &Arc<Self>, action_type: &'static str, seq: u64, reporting: bool) {
        let (Some(persistence), Some(storage)) = (&self.persistence, &self.storage) else {
            return;
        };

        let encoded = match persistence.encode(&self.store.snapshot()) {
            Ok(encoded) => encoded,
            Err(err) => {
                self.report(
                    ErrorLocation::ActionHandler,
                    action_type,
                    format!("failed to encode persisted state: {err}"),
                    Some(seq),
                    reporting,
                );
                return;
            }
        };

        let result = {
            let mut last = self
                .last_persisted
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if last.as_deref() == Some(encoded.as_str()) {
                trace!(key = persistence.key(), "Persisted state unchanged");
                return;
            }
            let result = storage.set(persistence.key(), &encoded);
            if result.is_ok() {
                *last = Some(encoded);
            }
            result
        };

        match result {
            Ok(()) => debug!(instance = %self.id, key = persistence.key(), "Persisted state"),
            Err(err) => self.report(
                ErrorLocation::ActionHandler,
                action_type,
                format!("failed to persist state: {err:#}"),
                Some(seq),
                reporting,
            ),
        }
    }

    fn handle_event(self: &Arc<Self>, event: &str, payload: &serde_json::Value) {
        if self.destroyed.load(Ordering::SeqCst) {
            debug!(instance = %self.id, event, "Instance torn down, ignoring event");
            return;
        }

        let handlers = self.events.resolve(event);
        if handlers.is_empty() {
            trace!(instance = %self.id, event, "No event handlers registered");
            return;
        }

        let dispatcher = self.dispatcher(None);
        for handler in handlers {
            let state = self.store.snapshot();
            let ctx = EventContext::new(event, payload, &*state, &dispatcher);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (handler.run)(&ctx)));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => format!("{err:#}"),
                Err(panic) => panic_message(&*panic),
            };
            let source = match handler.origin {
                Some(behavior) => format!("{behavior}:{event}"),
                None => event.to_string(),
            };
            self.report(ErrorLocation::EventHandler, &source, message, None, false);
        }
    }

    /// Log a failure and feed it back as `Lifecycle::ErrorThrown`.
    fn report(
        self: &Arc<Self>,
        location: ErrorLocation,
        source: &str,
        message: String,
        cause: Option<u64>,
        reporting: bool,
    ) {
        error!(
            instance = %self.id,
            component = self.name.as_str(),
            location = %location,
            source,
            error = message.as_str(),
            "Handler failed"
        );
        if reporting {
            return;
        }

        let report = ErrorReport::new(location, message).with_source(source);
        let action = Action::new(A::lifecycle(Lifecycle::ErrorThrown(report))).as_error();
        let generation = self.generation.load(Ordering::SeqCst);
        self.enqueue(action, cause, generation, true);
    }
}
