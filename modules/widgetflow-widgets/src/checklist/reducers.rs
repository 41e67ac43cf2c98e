//! Checklist state transitions as pure functions of the current snapshot.
//!
//! Each returns the delta to commit; `None` means nothing changes and an
//! `Err` aborts the reducer (the runtime reports it, the snapshot stays as
//! it was). Collections are always copied before modification.

use anyhow::{anyhow, bail, Result};
use checklist_client::ItemRecord;
use widgetflow_common::ErrorReport;

use super::actions::ChecklistAction;
use super::state::{is_local_id, ChecklistDelta, ChecklistState, Filter, Item};

pub fn input_changed(state: &ChecklistState, value: &str) -> Option<ChecklistDelta> {
    if state.input_value == value {
        return None;
    }
    Some(ChecklistDelta {
        input_value: Some(value.to_string()),
        ..Default::default()
    })
}

/// Append a client-side item and clear the input. Blank tasks are ignored.
pub fn add_item(state: &ChecklistState, task: &str) -> Option<ChecklistDelta> {
    let task = task.trim();
    if task.is_empty() {
        return None;
    }

    let mut items = state.items.clone();
    items.push(Item::local(task));
    Some(ChecklistDelta {
        items: Some(items),
        input_value: Some(String::new()),
        ..Default::default()
    })
}

/// Clear the input ahead of a server-side create. Returns the trimmed
/// description to request, or `None` for a blank input.
pub fn begin_create(input_value: &str) -> Option<(ChecklistDelta, String)> {
    let description = input_value.trim();
    if description.is_empty() {
        return None;
    }
    let delta = ChecklistDelta {
        input_value: Some(String::new()),
        ..Default::default()
    };
    Some((delta, description.to_string()))
}

/// Add the row the server created, replacing any item with the same id.
pub fn item_created(state: &ChecklistState, record: &ItemRecord) -> ChecklistDelta {
    let created = Item::from(record.clone());
    let mut items = state.items.clone();
    match items.iter_mut().find(|item| item.id == created.id) {
        Some(existing) => *existing = created,
        None => items.push(created),
    }
    ChecklistDelta::items(items)
}

/// Mark a remote load as in flight. `None` while one is already running.
pub fn begin_load(state: &ChecklistState) -> Option<ChecklistDelta> {
    if state.is_loading {
        return None;
    }
    Some(ChecklistDelta {
        is_loading: Some(true),
        error_on_load: Some(false),
        ..Default::default()
    })
}

/// Replace the synced items with the server's rows. Items created locally
/// and never synced are kept after them.
pub fn items_loaded(state: &ChecklistState, records: &[ItemRecord]) -> ChecklistDelta {
    let mut items: Vec<Item> = Vec::with_capacity(records.len());
    for record in records {
        if items.iter().all(|item| item.id != record.sys_id) {
            items.push(Item::from(record.clone()));
        }
    }
    items.extend(state.items.iter().filter(|item| item.is_local()).cloned());

    ChecklistDelta {
        items: Some(items),
        is_loading: Some(false),
        error_on_load: Some(false),
        ..Default::default()
    }
}

pub fn load_failed(message: String) -> ChecklistDelta {
    ChecklistDelta {
        is_loading: Some(false),
        error_on_load: Some(true),
        ..show_error(message)
    }
}

fn check_index(state: &ChecklistState, index: usize) -> Result<()> {
    if index >= state.items.len() {
        bail!(
            "no item at index {index} (checklist has {} items)",
            state.items.len()
        );
    }
    Ok(())
}

fn position(state: &ChecklistState, id: &str) -> Result<usize> {
    state
        .items
        .iter()
        .position(|item| item.id == id)
        .ok_or_else(|| anyhow!("no item with id {id}"))
}

/// Flip `active` on the item at `index`.
pub fn toggle(state: &ChecklistState, index: usize) -> Result<ChecklistDelta> {
    check_index(state, index)?;
    let mut items = state.items.clone();
    items[index].active = !items[index].active;
    Ok(ChecklistDelta::items(items))
}

/// Remove exactly the item at `index`.
pub fn delete(state: &ChecklistState, index: usize) -> Result<ChecklistDelta> {
    check_index(state, index)?;
    let mut items = state.items.clone();
    items.remove(index);
    Ok(ChecklistDelta::items(items))
}

/// Apply an edit by id. A new label also ends editing for that item.
pub fn update_item(
    state: &ChecklistState,
    id: &str,
    label: Option<&str>,
    active: Option<bool>,
) -> Result<ChecklistDelta> {
    let index = position(state, id)?;
    let mut items = state.items.clone();
    let item = &mut items[index];

    if let Some(label) = label {
        let label = label.trim();
        if label.is_empty() {
            bail!("item label cannot be empty");
        }
        item.label = label.to_string();
        item.editing = false;
    }
    if let Some(active) = active {
        item.active = active;
    }
    Ok(ChecklistDelta::items(items))
}

pub fn remove_item(state: &ChecklistState, id: &str) -> Result<ChecklistDelta> {
    let index = position(state, id)?;
    let mut items = state.items.clone();
    items.remove(index);
    Ok(ChecklistDelta::items(items))
}

/// Server update for an accepted edit. Local items and empty edits have
/// nothing to sync.
pub fn update_request(
    id: &str,
    label: Option<&str>,
    active: Option<bool>,
) -> Option<ChecklistAction> {
    if is_local_id(id) || (label.is_none() && active.is_none()) {
        return None;
    }
    Some(ChecklistAction::UpdateItemRequested {
        id: id.to_string(),
        label: label.map(|l| l.trim().to_string()),
        active,
    })
}

/// Server delete for an accepted removal. Local items have nothing to sync.
pub fn delete_request(id: &str) -> Option<ChecklistAction> {
    if is_local_id(id) {
        return None;
    }
    Some(ChecklistAction::DeleteItemRequested { id: id.to_string() })
}

/// Banner for a failed sync, remembered so a later success can clear it.
pub fn sync_failed(id: &str, message: String) -> ChecklistDelta {
    ChecklistDelta {
        failed_sync_id: Some(Some(id.to_string())),
        ..show_error(message)
    }
}

/// Clear the banner when it is this item's earlier sync failure.
pub fn item_synced(state: &ChecklistState, id: &str) -> Option<ChecklistDelta> {
    if state.failed_sync_id.as_deref() != Some(id) {
        return None;
    }
    Some(ChecklistDelta {
        last_error: Some(None),
        failed_sync_id: Some(None),
        ..Default::default()
    })
}

/// Put one item into editing mode; any other item leaves it.
pub fn start_edit(state: &ChecklistState, id: &str) -> Result<ChecklistDelta> {
    position(state, id)?;
    let items = state
        .items
        .iter()
        .map(|item| Item {
            editing: item.id == id,
            ..item.clone()
        })
        .collect();
    Ok(ChecklistDelta::items(items))
}

pub fn cancel_edit(state: &ChecklistState) -> Option<ChecklistDelta> {
    state.editing()?;
    let items = state
        .items
        .iter()
        .map(|item| Item {
            editing: false,
            ..item.clone()
        })
        .collect();
    Some(ChecklistDelta::items(items))
}

pub fn filter_changed(state: &ChecklistState, filter: Filter) -> Option<ChecklistDelta> {
    if state.filter == filter {
        return None;
    }
    Some(ChecklistDelta {
        filter: Some(filter),
        ..Default::default()
    })
}

pub fn show_error(message: String) -> ChecklistDelta {
    ChecklistDelta {
        last_error: Some(Some(message)),
        failed_sync_id: Some(None),
        ..Default::default()
    }
}

/// Banner text for a runtime error report.
pub fn describe_report(report: &ErrorReport) -> String {
    match &report.source {
        Some(source) => format!("{source} failed: {}", report.message),
        None => format!("{} failed: {}", report.location, report.message),
    }
}

pub fn dismiss_error(state: &ChecklistState) -> Option<ChecklistDelta> {
    state.last_error.as_ref()?;
    Some(ChecklistDelta {
        last_error: Some(None),
        failed_sync_id: Some(None),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use widgetflow_engine::Merge;

    fn with_items(flags: &[bool]) -> ChecklistState {
        let items = flags
            .iter()
            .enumerate()
            .map(|(i, &active)| Item {
                active,
                ..Item::local(format!("item {i}"))
            })
            .collect();
        ChecklistState {
            items,
            ..Default::default()
        }
    }

    fn record(id: &str, label: &str, active: bool) -> ItemRecord {
        ItemRecord {
            sys_id: id.into(),
            short_description: label.into(),
            active,
            assigned_to: None,
        }
    }

    // -----------------------------------------------------------------------
    // Add
    // -----------------------------------------------------------------------

    #[test]
    fn add_item_appends_and_clears_input() {
        let state = ChecklistState {
            input_value: "Buy milk".into(),
            ..Default::default()
        };
        let next = state.merge(add_item(&state, "Buy milk").unwrap());
        assert_eq!(next.items.len(), 1);
        assert_eq!(next.items[0].label, "Buy milk");
        assert!(!next.items[0].active);
        assert_eq!(next.input_value, "");
    }

    #[test]
    fn repeated_adds_get_unique_ids_in_order() {
        let mut state = ChecklistState::default();
        for label in ["a", "b", "c"] {
            state = state.merge(add_item(&state, label).unwrap());
        }
        let labels: Vec<_> = state.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert_ne!(state.items[0].id, state.items[1].id);
        assert_ne!(state.items[1].id, state.items[2].id);
    }

    #[test]
    fn blank_add_is_ignored() {
        assert!(add_item(&ChecklistState::default(), "   ").is_none());
        assert!(begin_create("").is_none());
        let (delta, description) = begin_create("  Call mom ").unwrap();
        assert_eq!(description, "Call mom");
        assert_eq!(delta.input_value.as_deref(), Some(""));
    }

    #[test]
    fn created_record_replaces_same_id() {
        let state = ChecklistState::default();
        let state = state.merge(item_created(&state, &record("s1", "a", false)));
        let state = state.merge(item_created(&state, &record("s1", "a!", true)));
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].label, "a!");
    }

    // -----------------------------------------------------------------------
    // By index
    // -----------------------------------------------------------------------

    #[test]
    fn toggle_flips_only_the_target() {
        let state = with_items(&[false, true]);
        let next = state.merge(toggle(&state, 0).unwrap());
        assert!(next.items[0].active);
        assert!(next.items[1].active);
        assert_eq!(next.items[1], state.items[1]);
    }

    #[test]
    fn double_toggle_restores() {
        let state = with_items(&[false]);
        let once = state.merge(toggle(&state, 0).unwrap());
        let twice = once.merge(toggle(&once, 0).unwrap());
        assert_eq!(twice.items, state.items);
    }

    #[test]
    fn delete_removes_exactly_one() {
        let state = with_items(&[false, false, false]);
        let next = state.merge(delete(&state, 1).unwrap());
        assert_eq!(next.items, vec![state.items[0].clone(), state.items[2].clone()]);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let state = with_items(&[false, false]);
        let err = delete(&state, 2).unwrap_err();
        assert!(err.to_string().contains("index 2"));
        assert!(toggle(&state, 5).is_err());
    }

    // -----------------------------------------------------------------------
    // By id and editing
    // -----------------------------------------------------------------------

    #[test]
    fn update_sets_label_and_ends_editing() {
        let state = with_items(&[false]);
        let id = state.items[0].id.clone();
        let state = state.merge(start_edit(&state, &id).unwrap());
        assert!(state.items[0].editing);

        let next = state.merge(update_item(&state, &id, Some(" renamed "), Some(true)).unwrap());
        assert_eq!(next.items[0].label, "renamed");
        assert!(next.items[0].active);
        assert!(!next.items[0].editing);

        assert!(update_item(&state, &id, Some(""), None).is_err());
        assert!(update_item(&state, "missing", None, Some(true)).is_err());
    }

    #[test]
    fn editing_is_exclusive() {
        let state = with_items(&[false, false]);
        let (a, b) = (state.items[0].id.clone(), state.items[1].id.clone());
        let state = state.merge(start_edit(&state, &a).unwrap());
        let state = state.merge(start_edit(&state, &b).unwrap());
        assert!(!state.items[0].editing);
        assert!(state.items[1].editing);

        let state = state.merge(cancel_edit(&state).unwrap());
        assert!(state.editing().is_none());
        assert!(cancel_edit(&state).is_none());
    }

    #[test]
    fn remove_by_id() {
        let state = with_items(&[false, true]);
        let id = state.items[1].id.clone();
        let next = state.merge(remove_item(&state, &id).unwrap());
        assert_eq!(next.items.len(), 1);
        assert!(remove_item(&next, &id).is_err());
    }

    #[test]
    fn only_server_items_are_synced() {
        let local = Item::local("x").id;
        assert!(update_request(&local, Some("y"), None).is_none());
        assert!(delete_request(&local).is_none());
        assert!(update_request("s1", None, None).is_none());

        match update_request("s1", Some(" renamed "), None) {
            Some(ChecklistAction::UpdateItemRequested { id, label, active }) => {
                assert_eq!(id, "s1");
                assert_eq!(label.as_deref(), Some("renamed"));
                assert_eq!(active, None);
            }
            other => panic!("unexpected request: {other:?}"),
        }
        assert!(matches!(
            delete_request("s1"),
            Some(ChecklistAction::DeleteItemRequested { id }) if id == "s1"
        ));
    }

    #[test]
    fn successful_sync_clears_only_its_own_failure() {
        let state = ChecklistState::default();
        assert!(item_synced(&state, "s1").is_none());

        let state = state.merge(sync_failed("s1", "Could not sync item s1".into()));
        assert!(item_synced(&state, "s2").is_none());
        let state = state.merge(item_synced(&state, "s1").unwrap());
        assert!(state.last_error.is_none());
        assert!(state.failed_sync_id.is_none());

        let state = state.merge(sync_failed("s1", "Could not sync item s1".into()));
        let state = state.merge(show_error("something else".into()));
        assert!(item_synced(&state, "s1").is_none());
        assert_eq!(state.last_error.as_deref(), Some("something else"));
    }

    // -----------------------------------------------------------------------
    // Loading, filter, errors
    // -----------------------------------------------------------------------

    #[test]
    fn load_is_guarded_and_keeps_local_items() {
        let state = with_items(&[false]);
        let loading = state.merge(begin_load(&state).unwrap());
        assert!(loading.is_loading);
        assert!(begin_load(&loading).is_none());

        let loaded = loading.merge(items_loaded(
            &loading,
            &[record("s1", "remote", true), record("s1", "dup", false)],
        ));
        assert!(!loaded.is_loading);
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].id, "s1");
        assert!(loaded.items[1].is_local());
    }

    #[test]
    fn load_failure_sets_flags() {
        let state = ChecklistState {
            is_loading: true,
            ..Default::default()
        };
        let next = state.merge(load_failed("offline".into()));
        assert!(!next.is_loading);
        assert!(next.error_on_load);
        assert_eq!(next.last_error.as_deref(), Some("offline"));
    }

    #[test]
    fn filter_change_leaves_items_alone() {
        let state = with_items(&[true, false]);
        let next = state.merge(filter_changed(&state, Filter::Complete).unwrap());
        assert_eq!(next.filter, Filter::Complete);
        assert_eq!(next.items, state.items);
        assert!(filter_changed(&next, Filter::Complete).is_none());
    }

    #[test]
    fn error_banner_round_trip() {
        let state = ChecklistState::default();
        assert!(dismiss_error(&state).is_none());
        let state = state.merge(show_error("boom".into()));
        let state = state.merge(dismiss_error(&state).unwrap());
        assert!(state.last_error.is_none());
    }
}
