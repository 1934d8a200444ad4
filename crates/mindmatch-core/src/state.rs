//! Shared process-wide sync state.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::connectivity::ConnectivityMonitor;
use crate::models::EntryId;

/// Sync indicator shown next to the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No connectivity; writes stay local
    Offline,
    /// A drain is replaying queued changes
    Syncing,
    /// Online with nothing queued
    Synced,
    /// Online but changes are still queued
    Pending,
}

/// Process-wide state owned by one sync engine.
///
/// The online flag lives in the [`ConnectivityMonitor`] and changes only
/// through its transitions. The current entry id mirrors the pointer persisted
/// in the local store.
#[derive(Debug)]
pub struct SyncState {
    connectivity: ConnectivityMonitor,
    current_entry_id: Mutex<Option<EntryId>>,
}

impl SyncState {
    pub fn new(connectivity: ConnectivityMonitor) -> Self {
        Self {
            connectivity,
            current_entry_id: Mutex::new(None),
        }
    }

    pub const fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn current_entry_id(&self) -> Option<EntryId> {
        self.current_entry_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_current_entry_id(&self, id: Option<EntryId>) {
        *self
            .current_entry_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = id;
    }
}

/// Snapshot of the sync state for indicators and the CLI `status` command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SyncSnapshot {
    pub status: SyncStatus,
    pub online: bool,
    pub pending_changes: usize,
    pub current_entry_id: Option<EntryId>,
}
