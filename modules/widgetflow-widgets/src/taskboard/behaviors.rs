//! Drag and drop for task cards.
//!
//! `dragstart` records what is being dragged; `drop` reads it back, either
//! from the event's `data` field (the serialized transfer payload) or from
//! the drag recorded in state, and dispatches the move.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use widgetflow_engine::Behavior;

use super::actions::TaskBoardAction;
use super::state::{DragData, TaskBoardState};

pub const DRAG: &str = "drag";
pub const DROP: &str = "drop";

fn usize_field(payload: &Value, field: &str) -> Result<usize> {
    let value = payload[field]
        .as_u64()
        .ok_or_else(|| anyhow!("event payload is missing numeric field `{field}`"))?;
    usize::try_from(value).with_context(|| format!("`{field}` does not fit in usize"))
}

/// Decode the transfer payload of a drop event.
pub fn transfer_data(payload: &Value, state: &TaskBoardState) -> Result<DragData> {
    match payload.get("data") {
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).context("drop data is not a serialized card drag")
        }
        Some(other) if !other.is_null() => {
            serde_json::from_value(other.clone()).context("drop data is not a card drag")
        }
        _ => state
            .dragging
            .clone()
            .ok_or_else(|| anyhow!("drop without a drag in progress")),
    }
}

/// `dragstart {card_id, lane}` and `dragend`.
pub fn drag_behavior() -> Behavior<TaskBoardState, TaskBoardAction> {
    Behavior::<TaskBoardState, TaskBoardAction>::new(DRAG)
        .on(&["dragstart"], |ctx| {
            let card_id = ctx.payload["card_id"]
                .as_str()
                .ok_or_else(|| anyhow!("event payload is missing string field `card_id`"))?;
            let from_lane = usize_field(ctx.payload, "lane")?;
            if ctx.state.locate(card_id).map(|(lane, _)| lane) != Some(from_lane) {
                return Err(anyhow!("card {card_id} is not in lane {from_lane}"));
            }
            ctx.dispatch(TaskBoardAction::DragStarted(DragData {
                card_id: card_id.to_string(),
                from_lane,
            }));
            Ok(())
        })
        .on(&["dragend"], |ctx| {
            ctx.dispatch(TaskBoardAction::DragEnded);
            Ok(())
        })
}

/// `dragover` (accepted, no-op) and `drop {lane, position?, data?}`.
pub fn drop_behavior() -> Behavior<TaskBoardState, TaskBoardAction> {
    Behavior::<TaskBoardState, TaskBoardAction>::new(DROP)
        .on(&["dragover"], |_ctx| Ok(()))
        .on(&["drop"], |ctx| {
            let data = transfer_data(ctx.payload, ctx.state)?;
            let to_lane = usize_field(ctx.payload, "lane")?;
            let position = match ctx.payload.get("position") {
                Some(Value::Null) | None => None,
                Some(_) => Some(usize_field(ctx.payload, "position")?),
            };
            ctx.dispatch(TaskBoardAction::CardMoved {
                card_id: data.card_id,
                from_lane: data.from_lane,
                to_lane,
                position,
            });
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transfer_data_prefers_the_payload() {
        let state = TaskBoardState {
            dragging: Some(DragData {
                card_id: "from-state".into(),
                from_lane: 2,
            }),
            ..Default::default()
        };

        let raw = json!({"data": r#"{"card_id":"c1","from_lane":0}"#});
        assert_eq!(transfer_data(&raw, &state).unwrap().card_id, "c1");

        let object = json!({"data": {"card_id": "c2", "from_lane": 1}});
        assert_eq!(transfer_data(&object, &state).unwrap().from_lane, 1);

        let none = json!({"lane": 1});
        assert_eq!(transfer_data(&none, &state).unwrap().card_id, "from-state");
    }

    #[test]
    fn transfer_data_rejects_garbage() {
        let state = TaskBoardState::default();
        assert!(transfer_data(&json!({"data": "not json"}), &state).is_err());
        assert!(transfer_data(&json!({}), &state).is_err());
    }
}
