//! Test renderer that keeps every snapshot it is handed.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use widgetflow_common::ActionType;

use crate::engine::Dispatcher;
use crate::traits::{Merge, Renderer};

pub struct SnapshotLog<S> {
    snapshots: Mutex<Vec<Arc<S>>>,
}

impl<S> Default for SnapshotLog<S> {
    fn default() -> Self {
        Self {
            snapshots: Mutex::new(Vec::new()),
        }
    }
}

impl<S> SnapshotLog<S> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshots(&self) -> Vec<Arc<S>> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn last(&self) -> Option<Arc<S>> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl<S: Merge, A: ActionType> Renderer<S, A> for SnapshotLog<S> {
    fn render(&self, snapshot: &Arc<S>, _dispatch: &Dispatcher<S, A>) -> Result<()> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot.clone());
        Ok(())
    }
}
