//! Click counter: a tally with increment and clear.

use std::sync::Arc;

use tracing::info;
use widgetflow_common::{ActionTag, ActionType, Lifecycle};
use widgetflow_engine::{InstanceBuilder, Merge, Persistence, Storage};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterState {
    pub tally: u64,
}

#[derive(Debug, Default)]
pub struct CounterDelta {
    pub tally: Option<u64>,
}

impl Merge for CounterState {
    type Delta = CounterDelta;

    fn merge(&self, delta: CounterDelta) -> Self {
        Self {
            tally: delta.tally.unwrap_or(self.tally),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CounterAction {
    Lifecycle(Lifecycle),
    Increment,
    Clear,
    /// Announces the new tally after every change.
    TallyChanged { tally: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterTag {
    Lifecycle,
    Increment,
    Clear,
    TallyChanged,
}

impl ActionTag for CounterTag {
    fn as_str(&self) -> &'static str {
        match self {
            CounterTag::Lifecycle => "COMPONENT_LIFECYCLE",
            CounterTag::Increment => "INCREMENT",
            CounterTag::Clear => "CLEAR",
            CounterTag::TallyChanged => "TALLY_CHANGED",
        }
    }
}

impl ActionType for CounterAction {
    type Tag = CounterTag;

    fn tag(&self) -> CounterTag {
        match self {
            CounterAction::Lifecycle(_) => CounterTag::Lifecycle,
            CounterAction::Increment => CounterTag::Increment,
            CounterAction::Clear => CounterTag::Clear,
            CounterAction::TallyChanged { .. } => CounterTag::TallyChanged,
        }
    }

    fn lifecycle(event: Lifecycle) -> Self {
        CounterAction::Lifecycle(event)
    }

    fn type_str(&self) -> &'static str {
        match self {
            CounterAction::Lifecycle(event) => event.type_str(),
            other => other.tag().as_str(),
        }
    }
}

pub fn storage_key(name: &str) -> String {
    format!("counter:{name}")
}

pub fn counter(
    name: &str,
    storage: Option<Arc<dyn Storage>>,
) -> InstanceBuilder<CounterState, CounterAction> {
    let label = name.to_string();
    let mut builder = InstanceBuilder::<_, CounterAction>::new(name, CounterState::default())
        .reducer(CounterTag::Lifecycle, move |ctx| {
            if let CounterAction::Lifecycle(Lifecycle::Bootstrapped) = &ctx.action.kind {
                info!(counter = label.as_str(), tally = ctx.state.tally, "Counter bootstrapped");
            }
            Ok(None)
        })
        .reducer(CounterTag::Increment, |ctx| {
            let tally = ctx.state.tally.saturating_add(1);
            ctx.dispatch(CounterAction::TallyChanged { tally });
            Ok(Some(CounterDelta { tally: Some(tally) }))
        })
        .reducer(CounterTag::Clear, |ctx| {
            if ctx.state.tally == 0 {
                return Ok(None);
            }
            ctx.dispatch(CounterAction::TallyChanged { tally: 0 });
            Ok(Some(CounterDelta { tally: Some(0) }))
        })
        .on_event("increment", |ctx| {
            ctx.dispatch(CounterAction::Increment);
            Ok(())
        })
        .on_event("clear", |ctx| {
            ctx.dispatch(CounterAction::Clear);
            Ok(())
        });

    if let Some(storage) = storage {
        builder = builder.storage(storage).persist(Persistence::json(
            storage_key(name),
            |state: &CounterState| state.tally,
            |tally: u64| CounterDelta { tally: Some(tally) },
        ));
    }

    builder
}
