//! Task board transitions.

use anyhow::{anyhow, bail, Result};

use super::state::{Card, DragData, TaskBoardDelta, TaskBoardState};

fn check_lane(state: &TaskBoardState, lane: usize) -> Result<()> {
    if lane >= state.lanes.len() {
        bail!("no lane {lane} (board has {} lanes)", state.lanes.len());
    }
    Ok(())
}

pub fn add_card(state: &TaskBoardState, lane: usize, title: &str) -> Result<TaskBoardDelta> {
    check_lane(state, lane)?;
    let title = title.trim();
    if title.is_empty() {
        bail!("card title cannot be empty");
    }

    let mut lanes = state.lanes.clone();
    lanes[lane].cards.push(Card::new(title));
    Ok(TaskBoardDelta::lanes(lanes))
}

/// Move a card between (or within) lanes and end any drag in progress.
pub fn move_card(
    state: &TaskBoardState,
    card_id: &str,
    from_lane: usize,
    to_lane: usize,
    position: Option<usize>,
) -> Result<TaskBoardDelta> {
    check_lane(state, from_lane)?;
    check_lane(state, to_lane)?;

    let mut lanes = state.lanes.clone();
    let index = lanes[from_lane]
        .cards
        .iter()
        .position(|c| c.id == card_id)
        .ok_or_else(|| anyhow!("card {card_id} is not in lane {from_lane}"))?;
    let card = lanes[from_lane].cards.remove(index);

    let target = &mut lanes[to_lane].cards;
    let at = position.unwrap_or(target.len()).min(target.len());
    target.insert(at, card);

    Ok(TaskBoardDelta {
        lanes: Some(lanes),
        dragging: Some(None),
        ..Default::default()
    })
}

pub fn remove_card(state: &TaskBoardState, card_id: &str) -> Result<TaskBoardDelta> {
    let (lane, index) = state
        .locate(card_id)
        .ok_or_else(|| anyhow!("no card with id {card_id}"))?;
    let mut lanes = state.lanes.clone();
    lanes[lane].cards.remove(index);
    Ok(TaskBoardDelta::lanes(lanes))
}

pub fn drag_started(data: &DragData) -> TaskBoardDelta {
    TaskBoardDelta {
        dragging: Some(Some(data.clone())),
        ..Default::default()
    }
}

pub fn drag_ended(state: &TaskBoardState) -> Option<TaskBoardDelta> {
    state.dragging.as_ref()?;
    Some(TaskBoardDelta {
        dragging: Some(None),
        ..Default::default()
    })
}
