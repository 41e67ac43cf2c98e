use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use checklist_client::ItemRecord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use widgetflow_engine::{DerivedFields, Merge};

/// Prefix of ids minted on the client, before the server assigns a `sys_id`.
pub const LOCAL_ID_PREFIX: &str = "local-";

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// One checklist entry. `active == true` means the item is done.
///
/// Persisted as `{id, label, active}`; `editing` is view state and never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub label: String,
    #[serde(alias = "completed")]
    pub active: bool,
    #[serde(skip)]
    pub editing: bool,
}

impl Item {
    /// A new, not-yet-done item with a client-generated id.
    pub fn local(label: impl Into<String>) -> Self {
        Self {
            id: format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4()),
            label: label.into(),
            active: false,
            editing: false,
        }
    }

    /// Whether the server has never seen this item.
    pub fn is_local(&self) -> bool {
        is_local_id(&self.id)
    }
}

pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

/// Drop repeated ids; the first occurrence wins.
pub fn unique_items(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

impl From<ItemRecord> for Item {
    fn from(record: ItemRecord) -> Self {
        Self {
            id: record.sys_id,
            label: record.short_description,
            active: record.active,
            editing: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Incomplete,
    Complete,
}

impl Filter {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Filter::All => true,
            Filter::Incomplete => !item.active,
            Filter::Complete => item.active,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::Incomplete => write!(f, "incomplete"),
            Filter::Complete => write!(f, "complete"),
        }
    }
}

impl FromStr for Filter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Filter::All),
            "incomplete" | "active" => Ok(Filter::Incomplete),
            "complete" | "completed" => Ok(Filter::Complete),
            other => Err(anyhow::anyhow!("unknown filter: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChecklistState {
    pub input_value: String,
    pub user_sys_id: String,
    pub items: Vec<Item>,
    pub is_loading: bool,
    pub error_on_load: bool,
    pub filter: Filter,
    /// Most recent failure, shown as a banner until dismissed.
    pub last_error: Option<String>,
    /// Item whose failed sync is the current banner.
    pub failed_sync_id: Option<String>,

    // Computed.
    pub items_left: usize,
    pub completed_count: usize,
    pub total_count: usize,
    pub visible: Vec<Item>,
}

impl ChecklistState {
    pub fn for_user(user_sys_id: impl Into<String>) -> Self {
        Self {
            user_sys_id: user_sys_id.into(),
            ..Default::default()
        }
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn editing(&self) -> Option<&Item> {
        self.items.iter().find(|item| item.editing)
    }
}

#[derive(Debug, Default)]
pub struct ChecklistDelta {
    pub input_value: Option<String>,
    pub user_sys_id: Option<String>,
    pub items: Option<Vec<Item>>,
    pub is_loading: Option<bool>,
    pub error_on_load: Option<bool>,
    pub filter: Option<Filter>,
    pub last_error: Option<Option<String>>,
    pub failed_sync_id: Option<Option<String>>,
    pub items_left: Option<usize>,
    pub completed_count: Option<usize>,
    pub total_count: Option<usize>,
    pub visible: Option<Vec<Item>>,
}

impl ChecklistDelta {
    pub fn items(items: Vec<Item>) -> Self {
        Self {
            items: Some(items),
            ..Default::default()
        }
    }
}

impl Merge for ChecklistState {
    type Delta = ChecklistDelta;

    fn merge(&self, delta: ChecklistDelta) -> Self {
        Self {
            input_value: delta.input_value.unwrap_or_else(|| self.input_value.clone()),
            user_sys_id: delta.user_sys_id.unwrap_or_else(|| self.user_sys_id.clone()),
            items: delta.items.unwrap_or_else(|| self.items.clone()),
            is_loading: delta.is_loading.unwrap_or(self.is_loading),
            error_on_load: delta.error_on_load.unwrap_or(self.error_on_load),
            filter: delta.filter.unwrap_or(self.filter),
            last_error: delta.last_error.unwrap_or_else(|| self.last_error.clone()),
            failed_sync_id: delta
                .failed_sync_id
                .unwrap_or_else(|| self.failed_sync_id.clone()),
            items_left: delta.items_left.unwrap_or(self.items_left),
            completed_count: delta.completed_count.unwrap_or(self.completed_count),
            total_count: delta.total_count.unwrap_or(self.total_count),
            visible: delta.visible.unwrap_or_else(|| self.visible.clone()),
        }
    }
}

/// `items_left`, `completed_count`, `total_count` and `visible`.
pub fn derived() -> DerivedFields<ChecklistState> {
    DerivedFields::new()
        .with("items_left", |s: &ChecklistState| ChecklistDelta {
            items_left: Some(s.items.iter().filter(|i| !i.active).count()),
            ..Default::default()
        })
        .with("completed_count", |s: &ChecklistState| ChecklistDelta {
            completed_count: Some(s.items.iter().filter(|i| i.active).count()),
            ..Default::default()
        })
        .with("total_count", |s: &ChecklistState| ChecklistDelta {
            total_count: Some(s.items.len()),
            ..Default::default()
        })
        .with("visible", |s: &ChecklistState| ChecklistDelta {
            visible: Some(
                s.items
                    .iter()
                    .filter(|i| s.filter.matches(i))
                    .cloned()
                    .collect(),
            ),
            ..Default::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str, active: bool) -> Item {
        Item {
            active,
            ..Item::local(label)
        }
    }

    #[test]
    fn local_ids_are_unique_and_prefixed() {
        let a = Item::local("a");
        let b = Item::local("a");
        assert_ne!(a.id, b.id);
        assert!(a.is_local());
        assert!(!a.active);
    }

    #[test]
    fn persisted_shape_skips_editing() {
        let mut item = item("Buy milk", true);
        item.id = "abc".into();
        item.editing = true;
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "abc", "label": "Buy milk", "active": true})
        );

        let back: Item =
            serde_json::from_str(r#"{"id":"abc","label":"Buy milk","completed":true}"#).unwrap();
        assert!(back.active);
        assert!(!back.editing);
    }

    #[test]
    fn filter_parses_and_matches() {
        assert_eq!("incomplete".parse::<Filter>().unwrap(), Filter::Incomplete);
        assert_eq!("completed".parse::<Filter>().unwrap(), Filter::Complete);
        assert!("sideways".parse::<Filter>().is_err());

        let done = item("x", true);
        assert!(Filter::All.matches(&done));
        assert!(Filter::Complete.matches(&done));
        assert!(!Filter::Incomplete.matches(&done));
        assert_eq!(Filter::default(), Filter::All);
    }

    #[test]
    fn derived_fields_recount() {
        let state = ChecklistState {
            items: vec![item("a", false), item("b", true), item("c", false)],
            filter: Filter::Complete,
            items_left: 99,
            ..Default::default()
        };
        let state = derived().apply(state);
        assert_eq!(state.items_left, 2);
        assert_eq!(state.completed_count, 1);
        assert_eq!(state.total_count, 3);
        assert_eq!(state.visible.len(), 1);
        assert_eq!(state.visible[0].label, "b");
    }

    #[test]
    fn repeated_ids_keep_the_first() {
        let mut first = item("first", false);
        first.id = "dup".into();
        let mut second = item("second", true);
        second.id = "dup".into();
        let other = item("other", false);

        let items = unique_items(vec![first.clone(), other.clone(), second]);
        assert_eq!(items, vec![first, other]);
    }

    #[test]
    fn record_becomes_item() {
        let record = ItemRecord {
            sys_id: "s1".into(),
            short_description: "Call mom".into(),
            active: false,
            assigned_to: None,
        };
        let item = Item::from(record);
        assert_eq!(item.id, "s1");
        assert!(!item.is_local());
    }
}
