//! Optional record of every handled action.
//!
//! Each entry points at the action that caused it (`caused_by`), so a reducer
//! dispatch or an effect completion can be traced back to its trigger.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct RecordedAction {
    pub seq: u64,
    pub ts: DateTime<Utc>,
    pub instance: Uuid,
    pub action_type: &'static str,
    pub caused_by: Option<u64>,
    pub is_error: bool,
    pub meta: Option<serde_json::Value>,
}

pub trait ActionSink: Send + Sync {
    fn record(&self, entry: RecordedAction);
}

impl<P: ActionSink + ?Sized> ActionSink for Arc<P> {
    fn record(&self, entry: RecordedAction) {
        (**self).record(entry)
    }
}

/// In-memory journal for tests.
#[derive(Default)]
pub struct MemoryActionSink {
    entries: Mutex<Vec<RecordedAction>>,
}

impl MemoryActionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<RecordedAction> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Just the type strings, in handling order.
    pub fn types(&self) -> Vec<&'static str> {
        self.entries().iter().map(|e| e.action_type).collect()
    }
}

impl ActionSink for MemoryActionSink {
    fn record(&self, entry: RecordedAction) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
