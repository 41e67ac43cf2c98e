//! Per-instance state/action runtime.
//!
//! dispatch → queue → reducers (sync, commit deltas) → derived fields →
//! render → effects (async, dispatch follow-ups). One action is handled at a
//! time per instance; actions raised while handling are queued breadth-first.
//!
//! Components supply a state type implementing [`Merge`], an action enum
//! implementing [`ActionType`](widgetflow_common::ActionType), and register
//! reducers / effects / computed fields on an [`InstanceBuilder`].

pub mod derived;
pub mod effects;
pub mod engine;
pub mod events;
pub mod journal;
pub mod persist;
pub mod registry;
pub mod store;
pub mod testing;
pub mod traits;

pub use derived::DerivedFields;
pub use effects::{CancelToken, Effect, EffectContext, EffectExecutor};
pub use engine::{Dispatcher, Instance, InstanceBuilder};
pub use events::{Behavior, EventContext};
pub use journal::{ActionSink, MemoryActionSink, RecordedAction};
pub use persist::{FileStorage, MemoryStorage, Persistence, Storage};
pub use registry::{Handler, HandlerRegistry, ReducerContext};
pub use store::StateStore;
pub use testing::SnapshotLog;
pub use traits::{Merge, RenderFn, Renderer};
