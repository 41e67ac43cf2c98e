//! Action envelope and the lifecycle vocabulary shared by every component.

use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registry key for an action. One variant per action type, no payload.
pub trait ActionTag: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// The SCREAMING_CASE type string used in logs and the action journal.
    fn as_str(&self) -> &'static str;
}

/// A component's closed set of actions.
///
/// Every variant maps to exactly one tag, so handler resolution is a plain
/// map lookup and an unhandled variant shows up as a missing match arm.
/// Components also embed [`Lifecycle`] so the runtime can raise
/// `Bootstrapped` / `ErrorThrown` without knowing the concrete enum.
pub trait ActionType: Clone + fmt::Debug + Send + Sync + 'static {
    type Tag: ActionTag;

    fn tag(&self) -> Self::Tag;

    fn lifecycle(event: Lifecycle) -> Self;

    fn type_str(&self) -> &'static str {
        self.tag().as_str()
    }
}

/// An action as it travels through the queue. Immutable once dispatched.
#[derive(Debug, Clone)]
pub struct Action<A> {
    pub kind: A,
    pub meta: Option<serde_json::Value>,
    pub is_error: bool,
}

impl<A> Action<A> {
    pub fn new(kind: A) -> Self {
        Self {
            kind,
            meta: None,
            is_error: false,
        }
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn as_error(mut self) -> Self {
        self.is_error = true;
        self
    }
}

impl<A> From<A> for Action<A> {
    fn from(kind: A) -> Self {
        Action::new(kind)
    }
}

/// Actions raised by the runtime itself rather than by a view.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    /// Dispatched once per instance, after persisted state has been loaded.
    Bootstrapped,
    /// A handler, renderer or event handler failed.
    ErrorThrown(ErrorReport),
}

impl Lifecycle {
    pub fn type_str(&self) -> &'static str {
        match self {
            Lifecycle::Bootstrapped => "COMPONENT_BOOTSTRAPPED",
            Lifecycle::ErrorThrown(_) => "COMPONENT_ERROR_THROWN",
        }
    }
}

/// Where a reported failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorLocation {
    EventHandler,
    Render,
    ActionHandler,
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorLocation::EventHandler => "event_handler",
            ErrorLocation::Render => "render",
            ErrorLocation::ActionHandler => "action_handler",
        };
        f.write_str(s)
    }
}

/// Payload of `Lifecycle::ErrorThrown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub location: ErrorLocation,
    pub message: String,
    /// Type string of the action (or name of the event) being handled.
    pub source: Option<String>,
    pub at: DateTime<Utc>,
}

impl ErrorReport {
    pub fn new(location: ErrorLocation, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
            source: None,
            at: Utc::now(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
