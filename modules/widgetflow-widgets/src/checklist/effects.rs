//! Server sync for the checklist, built on [`http_effect`].

use std::sync::Arc;

use anyhow::{anyhow, Context};
use checklist_client::{
    assigned_items_query, record_path, table_path, ApiResponse, ItemPatch, ItemRecord, NewItem,
};
use widgetflow_common::{Action, ActionType};
use widgetflow_engine::Effect;

use super::actions::ChecklistAction;
use super::state::ChecklistState;
use crate::http::{http_effect, HttpClient, HttpRequest};

type ChecklistEffect = Effect<ChecklistState, ChecklistAction>;

fn unexpected(action: &Action<ChecklistAction>) -> anyhow::Error {
    anyhow!("unexpected trigger {}", action.kind.type_str())
}

/// GET the user's items. Triggered by `LOAD_ITEMS_REQUESTED`.
pub fn load_items(client: Arc<dyn HttpClient>) -> ChecklistEffect {
    http_effect(
        "load-items",
        client,
        |_action| ChecklistAction::ItemsFetchStarted,
        |_action, state: &ChecklistState| {
            Ok(HttpRequest::get(table_path()).with_query(assigned_items_query(&state.user_sys_id)))
        },
        |_action, body| {
            let response: ApiResponse<Vec<ItemRecord>> =
                serde_json::from_value(body).context("unexpected item list payload")?;
            Ok(ChecklistAction::ItemsLoaded {
                records: response.result,
            })
        },
        |_action, error| ChecklistAction::ItemsLoadFailed { error },
    )
}

/// POST a new item. Triggered by `CREATE_ITEM_REQUESTED`.
pub fn create_item(client: Arc<dyn HttpClient>) -> ChecklistEffect {
    http_effect(
        "create-item",
        client,
        |_action| ChecklistAction::CreateItemStarted,
        |action: &Action<ChecklistAction>, _state| {
            let ChecklistAction::CreateItemRequested {
                short_description,
                assigned_to,
            } = &action.kind
            else {
                return Err(unexpected(action));
            };
            let body = NewItem {
                short_description: short_description.clone(),
                assigned_to: Some(assigned_to.clone()).filter(|u| !u.is_empty()),
                active: false,
            };
            Ok(HttpRequest::post(table_path(), serde_json::to_value(body)?))
        },
        |_action, body| {
            let response: ApiResponse<ItemRecord> =
                serde_json::from_value(body).context("unexpected created item payload")?;
            Ok(ChecklistAction::ItemCreated {
                record: response.result,
            })
        },
        |_action, error| ChecklistAction::CreateItemFailed { error },
    )
}

fn target_id(action: &Action<ChecklistAction>) -> String {
    match &action.kind {
        ChecklistAction::UpdateItemRequested { id, .. }
        | ChecklistAction::DeleteItemRequested { id } => id.clone(),
        _ => String::new(),
    }
}

/// PATCH an edited server item. Triggered by `UPDATE_ITEM_REQUESTED`.
pub fn update_item(client: Arc<dyn HttpClient>) -> ChecklistEffect {
    http_effect(
        "update-item",
        client,
        |action| ChecklistAction::ItemSyncStarted { id: target_id(action) },
        |action: &Action<ChecklistAction>, _state| {
            let ChecklistAction::UpdateItemRequested { id, label, active } = &action.kind else {
                return Err(unexpected(action));
            };
            let patch = ItemPatch {
                short_description: label.clone(),
                active: *active,
            };
            Ok(HttpRequest::patch(record_path(id), serde_json::to_value(patch)?))
        },
        |action, _body| Ok(ChecklistAction::ItemSynced { id: target_id(action) }),
        |action, error| ChecklistAction::ItemSyncFailed {
            id: target_id(action),
            error,
        },
    )
}

/// DELETE a removed server item. Triggered by `DELETE_ITEM_REQUESTED`.
pub fn delete_item(client: Arc<dyn HttpClient>) -> ChecklistEffect {
    http_effect(
        "delete-item",
        client,
        |action| ChecklistAction::ItemSyncStarted { id: target_id(action) },
        |action: &Action<ChecklistAction>, _state| match &action.kind {
            ChecklistAction::DeleteItemRequested { id } => Ok(HttpRequest::delete(record_path(id))),
            _ => Err(unexpected(action)),
        },
        |action, _body| Ok(ChecklistAction::ItemSynced { id: target_id(action) }),
        |action, error| ChecklistAction::ItemSyncFailed {
            id: target_id(action),
            error,
        },
    )
}
