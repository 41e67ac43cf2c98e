//! The task board: lanes of cards moved by drag and drop.

pub mod actions;
pub mod behaviors;
pub mod reducers;
pub mod state;

use std::sync::Arc;

use widgetflow_common::Lifecycle;
use widgetflow_engine::{InstanceBuilder, Persistence, Storage};

pub use actions::{TaskBoardAction, TaskBoardTag};
pub use state::{Card, DragData, Lane, TaskBoardDelta, TaskBoardState, DEFAULT_LANES};

pub fn storage_key(name: &str) -> String {
    format!("taskboard:{name}")
}

/// Declare a task board with the default lanes. With `storage`, the lanes
/// and their cards are persisted.
pub fn task_board(
    name: &str,
    storage: Option<Arc<dyn Storage>>,
) -> InstanceBuilder<TaskBoardState, TaskBoardAction> {
    let mut builder = InstanceBuilder::<_, TaskBoardAction>::new(name, TaskBoardState::default())
        .derived(state::derived())
        .reducer(TaskBoardTag::Lifecycle, |ctx| match &ctx.action.kind {
            TaskBoardAction::Lifecycle(Lifecycle::ErrorThrown(report)) => Ok(Some(TaskBoardDelta {
                last_error: Some(Some(report.message.clone())),
                dragging: Some(None),
                ..Default::default()
            })),
            _ => Ok(None),
        })
        .reducer(TaskBoardTag::CardAdded, |ctx| match &ctx.action.kind {
            TaskBoardAction::CardAdded { lane, title } => {
                reducers::add_card(ctx.state, *lane, title).map(Some)
            }
            _ => Ok(None),
        })
        .reducer(TaskBoardTag::CardMoved, |ctx| match &ctx.action.kind {
            TaskBoardAction::CardMoved {
                card_id,
                from_lane,
                to_lane,
                position,
            } => reducers::move_card(ctx.state, card_id, *from_lane, *to_lane, *position).map(Some),
            _ => Ok(None),
        })
        .reducer(TaskBoardTag::CardRemoved, |ctx| match &ctx.action.kind {
            TaskBoardAction::CardRemoved { card_id } => {
                reducers::remove_card(ctx.state, card_id).map(Some)
            }
            _ => Ok(None),
        })
        .reducer(TaskBoardTag::DragStarted, |ctx| match &ctx.action.kind {
            TaskBoardAction::DragStarted(data) => Ok(Some(reducers::drag_started(data))),
            _ => Ok(None),
        })
        .reducer(TaskBoardTag::DragEnded, |ctx| Ok(reducers::drag_ended(ctx.state)))
        .behavior(behaviors::drag_behavior())
        .behavior(behaviors::drop_behavior());

    if let Some(storage) = storage {
        builder = builder.storage(storage).persist(Persistence::json(
            storage_key(name),
            |state: &TaskBoardState| state.lanes.clone(),
            TaskBoardDelta::lanes,
        ));
    }

    builder
}
