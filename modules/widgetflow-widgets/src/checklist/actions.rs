use checklist_client::ItemRecord;
use widgetflow_common::{ActionTag, ActionType, EffectError, Lifecycle};

use super::state::Filter;

#[derive(Debug, Clone)]
pub enum ChecklistAction {
    Lifecycle(Lifecycle),

    // Input box
    InputChanged { value: String },
    /// Local add; the item only exists on the client until synced.
    AddItem { task: String },
    /// Remote add: clears the input and requests creation on the server.
    ChecklistItemAdd { input_value: String },
    CreateItemRequested { short_description: String, assigned_to: String },
    CreateItemStarted,
    ItemCreated { record: ItemRecord },
    CreateItemFailed { error: EffectError },

    // Remote load
    ItemsFetchRequested,
    /// Accepted fetch; not raised while a load is in flight.
    LoadItemsRequested,
    ItemsFetchStarted,
    ItemsLoaded { records: Vec<ItemRecord> },
    ItemsLoadFailed { error: EffectError },

    // By position
    ToggleClicked { index: usize },
    DeleteClicked { index: usize },

    // By id
    ItemUpdated {
        id: String,
        label: Option<String>,
        active: Option<bool>,
    },
    RemoveClicked { id: String },
    /// Raised only for server items, after the local edit was accepted.
    UpdateItemRequested {
        id: String,
        label: Option<String>,
        active: Option<bool>,
    },
    DeleteItemRequested { id: String },
    ItemSyncStarted { id: String },
    ItemSynced { id: String },
    ItemSyncFailed { id: String, error: EffectError },

    // Editing
    EditStarted { id: String },
    EditCancelled,

    FilterChanged { filter: Filter },
    ErrorDismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecklistTag {
    Lifecycle,
    InputChanged,
    AddItem,
    ChecklistItemAdd,
    CreateItemRequested,
    CreateItemStarted,
    ItemCreated,
    CreateItemFailed,
    ItemsFetchRequested,
    LoadItemsRequested,
    ItemsFetchStarted,
    ItemsLoaded,
    ItemsLoadFailed,
    ToggleClicked,
    DeleteClicked,
    ItemUpdated,
    RemoveClicked,
    UpdateItemRequested,
    DeleteItemRequested,
    ItemSyncStarted,
    ItemSynced,
    ItemSyncFailed,
    EditStarted,
    EditCancelled,
    FilterChanged,
    ErrorDismissed,
}

impl ActionTag for ChecklistTag {
    fn as_str(&self) -> &'static str {
        match self {
            ChecklistTag::Lifecycle => "COMPONENT_LIFECYCLE",
            ChecklistTag::InputChanged => "INPUT_CHANGED",
            ChecklistTag::AddItem => "ADD_ITEM",
            ChecklistTag::ChecklistItemAdd => "CHECKLIST_ITEM_ADD",
            ChecklistTag::CreateItemRequested => "CREATE_ITEM_REQUESTED",
            ChecklistTag::CreateItemStarted => "CREATE_ITEM_STARTED",
            ChecklistTag::ItemCreated => "ITEM_CREATED",
            ChecklistTag::CreateItemFailed => "CREATE_ITEM_FAILED",
            ChecklistTag::ItemsFetchRequested => "ITEMS_FETCH_REQUESTED",
            ChecklistTag::LoadItemsRequested => "LOAD_ITEMS_REQUESTED",
            ChecklistTag::ItemsFetchStarted => "ITEMS_FETCH_STARTED",
            ChecklistTag::ItemsLoaded => "ITEMS_LOADED",
            ChecklistTag::ItemsLoadFailed => "ITEMS_LOAD_FAILED",
            ChecklistTag::ToggleClicked => "TOGGLE_CLICKED",
            ChecklistTag::DeleteClicked => "DELETE_CLICKED",
            ChecklistTag::ItemUpdated => "CHECKLIST_ITEM_UPDATED",
            ChecklistTag::RemoveClicked => "REMOVE_BTN_CLICKED",
            ChecklistTag::UpdateItemRequested => "UPDATE_ITEM_REQUESTED",
            ChecklistTag::DeleteItemRequested => "DELETE_ITEM_REQUESTED",
            ChecklistTag::ItemSyncStarted => "ITEM_SYNC_STARTED",
            ChecklistTag::ItemSynced => "ITEM_SYNCED",
            ChecklistTag::ItemSyncFailed => "ITEM_SYNC_FAILED",
            ChecklistTag::EditStarted => "EDIT_STARTED",
            ChecklistTag::EditCancelled => "EDIT_CANCELLED",
            ChecklistTag::FilterChanged => "FILTER_CHANGED",
            ChecklistTag::ErrorDismissed => "ERROR_DISMISSED",
        }
    }
}

impl ActionType for ChecklistAction {
    type Tag = ChecklistTag;

    fn tag(&self) -> ChecklistTag {
        match self {
            ChecklistAction::Lifecycle(_) => ChecklistTag::Lifecycle,
            ChecklistAction::InputChanged { .. } => ChecklistTag::InputChanged,
            ChecklistAction::AddItem { .. } => ChecklistTag::AddItem,
            ChecklistAction::ChecklistItemAdd { .. } => ChecklistTag::ChecklistItemAdd,
            ChecklistAction::CreateItemRequested { .. } => ChecklistTag::CreateItemRequested,
            ChecklistAction::CreateItemStarted => ChecklistTag::CreateItemStarted,
            ChecklistAction::ItemCreated { .. } => ChecklistTag::ItemCreated,
            ChecklistAction::CreateItemFailed { .. } => ChecklistTag::CreateItemFailed,
            ChecklistAction::ItemsFetchRequested => ChecklistTag::ItemsFetchRequested,
            ChecklistAction::LoadItemsRequested => ChecklistTag::LoadItemsRequested,
            ChecklistAction::ItemsFetchStarted => ChecklistTag::ItemsFetchStarted,
            ChecklistAction::ItemsLoaded { .. } => ChecklistTag::ItemsLoaded,
            ChecklistAction::ItemsLoadFailed { .. } => ChecklistTag::ItemsLoadFailed,
            ChecklistAction::ToggleClicked { .. } => ChecklistTag::ToggleClicked,
            ChecklistAction::DeleteClicked { .. } => ChecklistTag::DeleteClicked,
            ChecklistAction::ItemUpdated { .. } => ChecklistTag::ItemUpdated,
            ChecklistAction::RemoveClicked { .. } => ChecklistTag::RemoveClicked,
            ChecklistAction::UpdateItemRequested { .. } => ChecklistTag::UpdateItemRequested,
            ChecklistAction::DeleteItemRequested { .. } => ChecklistTag::DeleteItemRequested,
            ChecklistAction::ItemSyncStarted { .. } => ChecklistTag::ItemSyncStarted,
            ChecklistAction::ItemSynced { .. } => ChecklistTag::ItemSynced,
            ChecklistAction::ItemSyncFailed { .. } => ChecklistTag::ItemSyncFailed,
            ChecklistAction::EditStarted { .. } => ChecklistTag::EditStarted,
            ChecklistAction::EditCancelled => ChecklistTag::EditCancelled,
            ChecklistAction::FilterChanged { .. } => ChecklistTag::FilterChanged,
            ChecklistAction::ErrorDismissed => ChecklistTag::ErrorDismissed,
        }
    }

    fn lifecycle(event: Lifecycle) -> Self {
        ChecklistAction::Lifecycle(event)
    }

    fn type_str(&self) -> &'static str {
        match self {
            ChecklistAction::Lifecycle(event) => event.type_str(),
            other => other.tag().as_str(),
        }
    }
}
