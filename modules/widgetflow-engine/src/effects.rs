//! Asynchronous side effects.
//!
//! An effect runs on the tokio runtime the instance was built on. It is
//! bracketed by actions: an optional "started" action is queued before the
//! effect is spawned, and the outcome comes back as a "succeeded" action (the
//! effect's own return value) or a "failed" action flagged `is_error`. Errors
//! and panics never escape the executor.
//!
//! Completions are dispatched through a [`Dispatcher`] bound to the instance
//! generation at start time, so anything settling after teardown is dropped.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, warn};
use widgetflow_common::{Action, ActionType, EffectError};

use crate::engine::Dispatcher;
use crate::persist::Storage;
use crate::traits::Merge;

type RunFn<S, A> =
    Box<dyn Fn(EffectContext<S, A>) -> BoxFuture<'static, anyhow::Result<Option<A>>> + Send + Sync>;
type StartedFn<A> = Box<dyn Fn(&Action<A>) -> A + Send + Sync>;
type FailedFn<A> = Box<dyn Fn(&Action<A>, EffectError) -> A + Send + Sync>;

/// An effect handler: the async body plus its started / failed actions.
pub struct Effect<S: Merge, A: ActionType> {
    name: &'static str,
    started: Option<StartedFn<A>>,
    run: RunFn<S, A>,
    failed: FailedFn<A>,
}

impl<S: Merge, A: ActionType> Effect<S, A> {
    /// `run` resolves to `Ok(Some(action))` for the succeeded action,
    /// `Ok(None)` when there is nothing to report, or `Err` which `failed`
    /// turns into the error action.
    pub fn new<F, Fut, E>(name: &'static str, run: F, failed: E) -> Self
    where
        F: Fn(EffectContext<S, A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<A>>> + Send + 'static,
        E: Fn(&Action<A>, EffectError) -> A + Send + Sync + 'static,
    {
        Self {
            name,
            started: None,
            run: Box::new(move |ctx| run(ctx).boxed()),
            failed: Box::new(failed),
        }
    }

    pub fn with_started(mut self, started: impl Fn(&Action<A>) -> A + Send + Sync + 'static) -> Self {
        self.started = Some(Box::new(started));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Cooperative cancellation signal, fired when the instance is torn down or
/// dropped.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the instance is torn down.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Everything an effect body receives. Owned, so it can move into the future.
pub struct EffectContext<S: Merge, A: ActionType> {
    pub action: Action<A>,
    /// Snapshot after the triggering action's reducers ran.
    pub state: Arc<S>,
    pub dispatcher: Dispatcher<S, A>,
    pub cancel: CancelToken,
    storage: Option<Arc<dyn Storage>>,
}

impl<S: Merge, A: ActionType> EffectContext<S, A> {
    pub fn storage(&self) -> Option<&Arc<dyn Storage>> {
        self.storage.as_ref()
    }
}

/// Spawns effects and tracks how many are in flight for one instance.
pub struct EffectExecutor {
    runtime: Handle,
    in_flight: Arc<watch::Sender<usize>>,
    cancel: watch::Sender<bool>,
}

impl EffectExecutor {
    pub fn new(runtime: Handle) -> Self {
        let (in_flight, _) = watch::channel(0);
        let (cancel, _) = watch::channel(false);
        Self {
            runtime,
            in_flight: Arc::new(in_flight),
            cancel,
        }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.cancel.subscribe(),
        }
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    pub(crate) fn cancel_all(&self) {
        self.cancel.send_replace(true);
    }

    /// Resolves when no effect is in flight.
    pub fn settled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.in_flight.subscribe();
        async move {
            loop {
                if *rx.borrow_and_update() == 0 {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        }
    }

    /// Run `effect` for `action`: queue the started action, spawn the body,
    /// dispatch the outcome.
    pub fn run<S: Merge, A: ActionType>(
        &self,
        effect: Arc<Effect<S, A>>,
        action: Action<A>,
        state: Arc<S>,
        dispatcher: Dispatcher<S, A>,
        storage: Option<Arc<dyn Storage>>,
    ) {
        if let Some(started) = &effect.started {
            dispatcher.dispatch(started(&action));
        }

        let ctx = EffectContext {
            action: action.clone(),
            state,
            dispatcher: dispatcher.clone(),
            cancel: self.token(),
            storage,
        };

        let guard = InFlight::enter(&self.in_flight);
        let name = effect.name;
        debug!(effect = name, action = action.kind.type_str(), "Effect started");

        self.runtime.spawn(async move {
            let _guard = guard;
            let body = effect.clone();
            let outcome = AssertUnwindSafe(async move { (body.run)(ctx).await })
                .catch_unwind()
                .await;

            let err = match outcome {
                Ok(Ok(Some(succeeded))) => {
                    complete(&dispatcher, name, Action::new(succeeded));
                    return;
                }
                Ok(Ok(None)) => return,
                Ok(Err(err)) => {
                    let err = EffectError::from(err);
                    warn!(effect = name, error = %err, "Effect failed");
                    err
                }
                Err(panic) => {
                    let err = EffectError::Panicked(panic_message(&*panic));
                    warn!(effect = name, error = %err, "Effect panicked");
                    err
                }
            };

            let failed = panic::catch_unwind(AssertUnwindSafe(|| (effect.failed)(&action, err)));
            match failed {
                Ok(failed) => complete(&dispatcher, name, Action::new(failed).as_error()),
                Err(panic) => error!(
                    effect = name,
                    error = panic_message(&*panic).as_str(),
                    "Failed-action mapper panicked, outcome dropped"
                ),
            }
        });
    }
}

fn complete<S: Merge, A: ActionType>(dispatcher: &Dispatcher<S, A>, name: &str, action: Action<A>) {
    if !dispatcher.dispatch_action(action) {
        debug!(effect = name, "Effect settled after teardown, completion dropped");
    }
}

/// Counts one effect as in flight until dropped, however its task ends.
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn enter(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
