use widgetflow_common::{ActionTag, ActionType, Lifecycle};

use super::state::DragData;

#[derive(Debug, Clone)]
pub enum TaskBoardAction {
    Lifecycle(Lifecycle),
    CardAdded {
        lane: usize,
        title: String,
    },
    /// `position` is clamped to the target lane; `None` appends.
    CardMoved {
        card_id: String,
        from_lane: usize,
        to_lane: usize,
        position: Option<usize>,
    },
    CardRemoved {
        card_id: String,
    },
    DragStarted(DragData),
    DragEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskBoardTag {
    Lifecycle,
    CardAdded,
    CardMoved,
    CardRemoved,
    DragStarted,
    DragEnded,
}

impl ActionTag for TaskBoardTag {
    fn as_str(&self) -> &'static str {
        match self {
            TaskBoardTag::Lifecycle => "COMPONENT_LIFECYCLE",
            TaskBoardTag::CardAdded => "CARD_ADDED",
            TaskBoardTag::CardMoved => "CARD_MOVED",
            TaskBoardTag::CardRemoved => "CARD_REMOVED",
            TaskBoardTag::DragStarted => "DRAG_STARTED",
            TaskBoardTag::DragEnded => "DRAG_ENDED",
        }
    }
}

impl ActionType for TaskBoardAction {
    type Tag = TaskBoardTag;

    fn tag(&self) -> TaskBoardTag {
        match self {
            TaskBoardAction::Lifecycle(_) => TaskBoardTag::Lifecycle,
            TaskBoardAction::CardAdded { .. } => TaskBoardTag::CardAdded,
            TaskBoardAction::CardMoved { .. } => TaskBoardTag::CardMoved,
            TaskBoardAction::CardRemoved { .. } => TaskBoardTag::CardRemoved,
            TaskBoardAction::DragStarted(_) => TaskBoardTag::DragStarted,
            TaskBoardAction::DragEnded => TaskBoardTag::DragEnded,
        }
    }

    fn lifecycle(event: Lifecycle) -> Self {
        TaskBoardAction::Lifecycle(event)
    }

    fn type_str(&self) -> &'static str {
        match self {
            TaskBoardAction::Lifecycle(event) => event.type_str(),
            other => other.tag().as_str(),
        }
    }
}
