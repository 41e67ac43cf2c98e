//! The checklist component.
//!
//! Items can be added locally (`ADD_ITEM`) or created on the server
//! (`CHECKLIST_ITEM_ADD` → `CREATE_ITEM_REQUESTED` → `ITEM_CREATED`), toggled
//! and deleted by position, edited and removed by id. With an HTTP client
//! configured the list is loaded from the server at bootstrap and edits are
//! synced back; with storage configured the items survive restarts.
//!
//! Server requests hang off `*_REQUESTED` actions that reducers raise only
//! after the local change was accepted, so a rejected edit never reaches the
//! server.

pub mod actions;
pub mod effects;
pub mod reducers;
pub mod state;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use checklist_client::ChecklistClient;
use serde_json::Value;
use tracing::{debug, info};
use widgetflow_common::{Config, FlowError, Lifecycle};
use widgetflow_engine::{FileStorage, InstanceBuilder, Persistence, Storage};

pub use actions::{ChecklistAction, ChecklistTag};
pub use state::{ChecklistDelta, ChecklistState, Filter, Item};

use crate::http::HttpClient;

/// Collaborators for one checklist instance.
#[derive(Default)]
pub struct ChecklistOptions {
    pub user_sys_id: String,
    pub client: Option<Arc<dyn HttpClient>>,
    pub storage: Option<Arc<dyn Storage>>,
}

impl ChecklistOptions {
    /// Options for `user_sys_id` from the runtime config: a REST client when
    /// an API base URL is set, file storage when a storage directory is set.
    pub fn from_config(config: &Config, user_sys_id: &str) -> Result<Self, FlowError> {
        let client: Option<Arc<dyn HttpClient>> = match &config.api_base_url {
            Some(base_url) => {
                let client = ChecklistClient::new(
                    base_url,
                    config.api_token.as_deref(),
                    config.http_timeout,
                )
                .map_err(|e| FlowError::Config(format!("Failed to build API client: {e}")))?;
                Some(Arc::new(client))
            }
            None => None,
        };

        let storage: Option<Arc<dyn Storage>> = match &config.storage_dir {
            Some(dir) => {
                let storage =
                    FileStorage::open(dir).map_err(|e| FlowError::Storage(format!("{e:#}")))?;
                Some(Arc::new(storage))
            }
            None => None,
        };

        info!(
            user = user_sys_id,
            remote = client.is_some(),
            persisted = storage.is_some(),
            "Checklist options resolved"
        );

        Ok(Self {
            user_sys_id: user_sys_id.to_string(),
            client,
            storage,
        })
    }
}

/// Storage key of a checklist's items.
pub fn storage_key(name: &str) -> String {
    format!("checklist:{name}")
}

/// Declare a checklist instance. Add a renderer or journal and `build()`.
pub fn checklist(
    name: &str,
    options: ChecklistOptions,
) -> InstanceBuilder<ChecklistState, ChecklistAction> {
    let remote = options.client.is_some();
    let initial = ChecklistState::for_user(options.user_sys_id);
    let mut builder = InstanceBuilder::<_, ChecklistAction>::new(name, initial)
        .derived(state::derived())
        .reducer(ChecklistTag::Lifecycle, move |ctx| match &ctx.action.kind {
            ChecklistAction::Lifecycle(Lifecycle::Bootstrapped) => {
                if remote {
                    ctx.dispatch(ChecklistAction::ItemsFetchRequested);
                }
                Ok(None)
            }
            ChecklistAction::Lifecycle(Lifecycle::ErrorThrown(report)) => {
                Ok(Some(reducers::show_error(reducers::describe_report(report))))
            }
            _ => Ok(None),
        })
        .reducer(ChecklistTag::InputChanged, |ctx| match &ctx.action.kind {
            ChecklistAction::InputChanged { value } => Ok(reducers::input_changed(ctx.state, value)),
            _ => Ok(None),
        })
        .reducer(ChecklistTag::AddItem, |ctx| match &ctx.action.kind {
            ChecklistAction::AddItem { task } => Ok(reducers::add_item(ctx.state, task)),
            _ => Ok(None),
        })
        .reducer(ChecklistTag::ChecklistItemAdd, |ctx| {
            let ChecklistAction::ChecklistItemAdd { input_value } = &ctx.action.kind else {
                return Ok(None);
            };
            let Some((delta, description)) = reducers::begin_create(input_value) else {
                return Ok(None);
            };
            ctx.dispatch(ChecklistAction::CreateItemRequested {
                short_description: description,
                assigned_to: ctx.state.user_sys_id.clone(),
            });
            Ok(Some(delta))
        })
        .reducer(ChecklistTag::ItemCreated, |ctx| match &ctx.action.kind {
            ChecklistAction::ItemCreated { record } => {
                Ok(Some(reducers::item_created(ctx.state, record)))
            }
            _ => Ok(None),
        })
        .reducer(ChecklistTag::CreateItemFailed, |ctx| match &ctx.action.kind {
            ChecklistAction::CreateItemFailed { error } => Ok(Some(reducers::show_error(
                format!("Could not create item: {error}"),
            ))),
            _ => Ok(None),
        })
        .reducer(ChecklistTag::ItemsFetchRequested, |ctx| {
            match reducers::begin_load(ctx.state) {
                Some(delta) => {
                    ctx.dispatch(ChecklistAction::LoadItemsRequested);
                    Ok(Some(delta))
                }
                None => {
                    debug!("Item load already in flight");
                    Ok(None)
                }
            }
        })
        .reducer(ChecklistTag::ItemsLoaded, |ctx| match &ctx.action.kind {
            ChecklistAction::ItemsLoaded { records } => {
                Ok(Some(reducers::items_loaded(ctx.state, records)))
            }
            _ => Ok(None),
        })
        .reducer(ChecklistTag::ItemsLoadFailed, |ctx| match &ctx.action.kind {
            ChecklistAction::ItemsLoadFailed { error } => Ok(Some(reducers::load_failed(
                format!("Could not load items: {error}"),
            ))),
            _ => Ok(None),
        })
        .reducer(ChecklistTag::ToggleClicked, |ctx| match &ctx.action.kind {
            ChecklistAction::ToggleClicked { index } => reducers::toggle(ctx.state, *index).map(Some),
            _ => Ok(None),
        })
        .reducer(ChecklistTag::DeleteClicked, |ctx| match &ctx.action.kind {
            ChecklistAction::DeleteClicked { index } => reducers::delete(ctx.state, *index).map(Some),
            _ => Ok(None),
        })
        .reducer(ChecklistTag::ItemUpdated, move |ctx| {
            let ChecklistAction::ItemUpdated { id, label, active } = &ctx.action.kind else {
                return Ok(None);
            };
            let delta = reducers::update_item(ctx.state, id, label.as_deref(), *active)?;
            if remote {
                if let Some(request) = reducers::update_request(id, label.as_deref(), *active) {
                    ctx.dispatch(request);
                }
            }
            Ok(Some(delta))
        })
        .reducer(ChecklistTag::RemoveClicked, move |ctx| {
            let ChecklistAction::RemoveClicked { id } = &ctx.action.kind else {
                return Ok(None);
            };
            let delta = reducers::remove_item(ctx.state, id)?;
            if remote {
                if let Some(request) = reducers::delete_request(id) {
                    ctx.dispatch(request);
                }
            }
            Ok(Some(delta))
        })
        .reducer(ChecklistTag::ItemSynced, |ctx| match &ctx.action.kind {
            ChecklistAction::ItemSynced { id } => Ok(reducers::item_synced(ctx.state, id)),
            _ => Ok(None),
        })
        .reducer(ChecklistTag::ItemSyncFailed, |ctx| match &ctx.action.kind {
            ChecklistAction::ItemSyncFailed { id, error } => Ok(Some(reducers::sync_failed(
                id,
                format!("Could not sync item {id}: {error}"),
            ))),
            _ => Ok(None),
        })
        .reducer(ChecklistTag::EditStarted, |ctx| match &ctx.action.kind {
            ChecklistAction::EditStarted { id } => reducers::start_edit(ctx.state, id).map(Some),
            _ => Ok(None),
        })
        .reducer(ChecklistTag::EditCancelled, |ctx| Ok(reducers::cancel_edit(ctx.state)))
        .reducer(ChecklistTag::FilterChanged, |ctx| match &ctx.action.kind {
            ChecklistAction::FilterChanged { filter } => {
                Ok(reducers::filter_changed(ctx.state, *filter))
            }
            _ => Ok(None),
        })
        .reducer(ChecklistTag::ErrorDismissed, |ctx| Ok(reducers::dismiss_error(ctx.state)));

    builder = install_events(builder, remote);

    if let Some(client) = options.client {
        builder = builder
            .effect(ChecklistTag::LoadItemsRequested, effects::load_items(client.clone()))
            .effect(ChecklistTag::CreateItemRequested, effects::create_item(client.clone()))
            .effect(ChecklistTag::UpdateItemRequested, effects::update_item(client.clone()))
            .effect(ChecklistTag::DeleteItemRequested, effects::delete_item(client));
    }

    if let Some(storage) = options.storage {
        builder = builder.storage(storage).persist(Persistence::json(
            storage_key(name),
            |state: &ChecklistState| state.items.clone(),
            |items: Vec<Item>| ChecklistDelta::items(state::unique_items(items)),
        ));
    }

    builder
}

// ---------------------------------------------------------------------------
// View events
// ---------------------------------------------------------------------------

fn str_field<'a>(payload: &'a Value, field: &str) -> Result<&'a str> {
    payload[field]
        .as_str()
        .ok_or_else(|| anyhow!("event payload is missing string field `{field}`"))
}

fn index_field(payload: &Value) -> Result<usize> {
    let index = payload["index"]
        .as_u64()
        .ok_or_else(|| anyhow!("event payload is missing numeric field `index`"))?;
    usize::try_from(index).context("index does not fit in usize")
}

/// Raw view events: `input`, `submit`, `toggle`, `delete`, `edit`, `save`,
/// `cancel`, `check`, `remove`, `filter`, `dismiss`.
fn install_events(
    builder: InstanceBuilder<ChecklistState, ChecklistAction>,
    remote: bool,
) -> InstanceBuilder<ChecklistState, ChecklistAction> {
    builder
        .on_event("input", |ctx| {
            let value = str_field(ctx.payload, "value")?;
            ctx.dispatch(ChecklistAction::InputChanged {
                value: value.to_string(),
            });
            Ok(())
        })
        .on_event("submit", move |ctx| {
            let input_value = ctx.state.input_value.clone();
            if remote {
                ctx.dispatch(ChecklistAction::ChecklistItemAdd { input_value });
            } else {
                ctx.dispatch(ChecklistAction::AddItem { task: input_value });
            }
            Ok(())
        })
        .on_event("toggle", |ctx| {
            ctx.dispatch(ChecklistAction::ToggleClicked {
                index: index_field(ctx.payload)?,
            });
            Ok(())
        })
        .on_event("delete", |ctx| {
            ctx.dispatch(ChecklistAction::DeleteClicked {
                index: index_field(ctx.payload)?,
            });
            Ok(())
        })
        .on_event("edit", |ctx| {
            ctx.dispatch(ChecklistAction::EditStarted {
                id: str_field(ctx.payload, "id")?.to_string(),
            });
            Ok(())
        })
        .on_event("save", |ctx| {
            ctx.dispatch(ChecklistAction::ItemUpdated {
                id: str_field(ctx.payload, "id")?.to_string(),
                label: Some(str_field(ctx.payload, "label")?.to_string()),
                active: None,
            });
            Ok(())
        })
        .on_event("cancel", |ctx| {
            ctx.dispatch(ChecklistAction::EditCancelled);
            Ok(())
        })
        .on_event("check", |ctx| {
            let active = ctx.payload["active"]
                .as_bool()
                .ok_or_else(|| anyhow!("event payload is missing boolean field `active`"))?;
            ctx.dispatch(ChecklistAction::ItemUpdated {
                id: str_field(ctx.payload, "id")?.to_string(),
                label: None,
                active: Some(active),
            });
            Ok(())
        })
        .on_event("remove", |ctx| {
            ctx.dispatch(ChecklistAction::RemoveClicked {
                id: str_field(ctx.payload, "id")?.to_string(),
            });
            Ok(())
        })
        .on_event("filter", |ctx| {
            let filter: Filter = str_field(ctx.payload, "filter")?.parse()?;
            ctx.dispatch(ChecklistAction::FilterChanged { filter });
            Ok(())
        })
        .on_event("dismiss", |ctx| {
            ctx.dispatch(ChecklistAction::ErrorDismissed);
            Ok(())
        })
}
