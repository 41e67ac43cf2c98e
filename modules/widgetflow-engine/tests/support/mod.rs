//! Shared fixtures for the engine integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use widgetflow_common::{ActionTag, ActionType, EffectError, ErrorReport, Lifecycle};
use widgetflow_engine::{InstanceBuilder, Merge};

// ---------------------------------------------------------------------------
// Test actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestTag {
    Lifecycle,
    Push,
    Fail,
    Fetch,
    FetchStarted,
    FetchSucceeded,
    FetchFailed,
    Ignored,
}

impl ActionTag for TestTag {
    fn as_str(&self) -> &'static str {
        match self {
            TestTag::Lifecycle => "LIFECYCLE",
            TestTag::Push => "PUSH",
            TestTag::Fail => "FAIL",
            TestTag::Fetch => "FETCH",
            TestTag::FetchStarted => "FETCH_STARTED",
            TestTag::FetchSucceeded => "FETCH_SUCCEEDED",
            TestTag::FetchFailed => "FETCH_FAILED",
            TestTag::Ignored => "IGNORED",
        }
    }
}

#[derive(Debug, Clone)]
pub enum TestAction {
    Lifecycle(Lifecycle),
    Push(String),
    Fail,
    Fetch { label: String },
    FetchStarted { label: String },
    FetchSucceeded { label: String },
    FetchFailed { label: String, error: EffectError },
    Ignored,
}

impl ActionType for TestAction {
    type Tag = TestTag;

    fn tag(&self) -> TestTag {
        match self {
            TestAction::Lifecycle(_) => TestTag::Lifecycle,
            TestAction::Push(_) => TestTag::Push,
            TestAction::Fail => TestTag::Fail,
            TestAction::Fetch { .. } => TestTag::Fetch,
            TestAction::FetchStarted { .. } => TestTag::FetchStarted,
            TestAction::FetchSucceeded { .. } => TestTag::FetchSucceeded,
            TestAction::FetchFailed { .. } => TestTag::FetchFailed,
            TestAction::Ignored => TestTag::Ignored,
        }
    }

    fn lifecycle(event: Lifecycle) -> Self {
        TestAction::Lifecycle(event)
    }
}

// ---------------------------------------------------------------------------
// Test state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestState {
    pub log: Vec<String>,
    pub count: usize,
    pub errors: Vec<ErrorReport>,
}

#[derive(Debug, Default)]
pub struct TestDelta {
    pub log: Option<Vec<String>>,
    pub count: Option<usize>,
    pub errors: Option<Vec<ErrorReport>>,
}

impl Merge for TestState {
    type Delta = TestDelta;

    fn merge(&self, delta: TestDelta) -> Self {
        Self {
            log: delta.log.unwrap_or_else(|| self.log.clone()),
            count: delta.count.unwrap_or(self.count),
            errors: delta.errors.unwrap_or_else(|| self.errors.clone()),
        }
    }
}

/// Delta appending `entry` to the log.
pub fn push(state: &TestState, entry: impl Into<String>) -> TestDelta {
    let mut log = state.log.clone();
    log.push(entry.into());
    TestDelta {
        log: Some(log),
        ..Default::default()
    }
}

/// Builder with the `count` computed field and an `ErrorThrown` collector.
pub fn builder() -> InstanceBuilder<TestState, TestAction> {
    InstanceBuilder::<TestState, TestAction>::new("test", TestState::default())
        .computed("count", |s: &TestState| TestDelta {
            count: Some(s.log.len()),
            ..Default::default()
        })
        .reducer(TestTag::Lifecycle, |ctx| match &ctx.action.kind {
            TestAction::Lifecycle(Lifecycle::ErrorThrown(report)) => {
                let mut errors = ctx.state.errors.clone();
                errors.push(report.clone());
                Ok(Some(TestDelta {
                    errors: Some(errors),
                    ..Default::default()
                }))
            }
            _ => Ok(None),
        })
}

/// Reducer body that logs `Push` labels.
pub fn log_push(
    ctx: &widgetflow_engine::ReducerContext<'_, TestState, TestAction>,
) -> anyhow::Result<Option<TestDelta>> {
    match &ctx.action.kind {
        TestAction::Push(label) => Ok(Some(push(ctx.state, label.clone()))),
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Effect gates
// ---------------------------------------------------------------------------

/// Lets a test decide when each effect completes.
#[derive(Clone, Default)]
pub struct Gates {
    pending: Arc<Mutex<HashMap<String, oneshot::Receiver<()>>>>,
}

impl Gates {
    pub fn open_later(&self, label: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(label.to_string(), rx);
        tx
    }

    pub fn take(&self, label: &str) -> Option<oneshot::Receiver<()>> {
        self.pending.lock().unwrap().remove(label)
    }
}

/// Poll `check` until it holds, yielding to spawned tasks in between.
pub async fn eventually(check: impl Fn() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}
