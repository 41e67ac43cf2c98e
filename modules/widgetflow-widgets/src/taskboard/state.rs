use serde::{Deserialize, Serialize};
use uuid::Uuid;
use widgetflow_engine::{DerivedFields, Merge};

/// Lane titles of a new board, left to right.
pub const DEFAULT_LANES: [&str; 3] = ["To Do", "In Progress", "Done"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub title: String,
}

impl Card {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: format!("card-{}", Uuid::new_v4()),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub title: String,
    pub cards: Vec<Card>,
}

impl Lane {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            cards: Vec::new(),
        }
    }
}

/// What a drag carries from `dragstart` to `drop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragData {
    pub card_id: String,
    pub from_lane: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskBoardState {
    pub lanes: Vec<Lane>,
    pub dragging: Option<DragData>,
    pub last_error: Option<String>,

    // Computed.
    pub card_count: usize,
}

impl Default for TaskBoardState {
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANES.iter().map(|title| Lane::new(*title)).collect(),
            dragging: None,
            last_error: None,
            card_count: 0,
        }
    }
}

impl TaskBoardState {
    /// `(lane, position)` of a card.
    pub fn locate(&self, card_id: &str) -> Option<(usize, usize)> {
        self.lanes.iter().enumerate().find_map(|(lane, l)| {
            l.cards
                .iter()
                .position(|c| c.id == card_id)
                .map(|pos| (lane, pos))
        })
    }
}

#[derive(Debug, Default)]
pub struct TaskBoardDelta {
    pub lanes: Option<Vec<Lane>>,
    pub dragging: Option<Option<DragData>>,
    pub last_error: Option<Option<String>>,
    pub card_count: Option<usize>,
}

impl TaskBoardDelta {
    pub fn lanes(lanes: Vec<Lane>) -> Self {
        Self {
            lanes: Some(lanes),
            ..Default::default()
        }
    }
}

impl Merge for TaskBoardState {
    type Delta = TaskBoardDelta;

    fn merge(&self, delta: TaskBoardDelta) -> Self {
        Self {
            lanes: delta.lanes.unwrap_or_else(|| self.lanes.clone()),
            dragging: delta.dragging.unwrap_or_else(|| self.dragging.clone()),
            last_error: delta.last_error.unwrap_or_else(|| self.last_error.clone()),
            card_count: delta.card_count.unwrap_or(self.card_count),
        }
    }
}

pub fn derived() -> DerivedFields<TaskBoardState> {
    DerivedFields::new().with("card_count", |s: &TaskBoardState| TaskBoardDelta {
        card_count: Some(s.lanes.iter().map(|l| l.cards.len()).sum()),
        ..Default::default()
    })
}
