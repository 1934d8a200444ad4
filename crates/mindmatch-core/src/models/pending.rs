//! Queued local mutations awaiting replay against the remote store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entry, EntryId};

/// A local mutation not yet confirmed by the remote entry API.
///
/// Serialized as `{"type": "save" | "delete", "payload": ..., "enqueuedAt": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PendingChange {
    /// Create or update the full entry
    Save {
        payload: Entry,
        enqueued_at: DateTime<Utc>,
    },
    /// Remove the entry with this id
    Delete {
        payload: EntryId,
        enqueued_at: DateTime<Utc>,
    },
}

impl PendingChange {
    #[must_use]
    pub fn save(entry: Entry) -> Self {
        Self::Save {
            payload: entry,
            enqueued_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn delete(id: EntryId) -> Self {
        Self::Delete {
            payload: id,
            enqueued_at: Utc::now(),
        }
    }

    /// The entry this change refers to
    pub const fn entry_id(&self) -> &EntryId {
        match self {
            Self::Save { payload, .. } => payload.id(),
            Self::Delete { payload, .. } => payload,
        }
    }

    pub const fn enqueued_at(&self) -> DateTime<Utc> {
        match self {
            Self::Save { enqueued_at, .. } | Self::Delete { enqueued_at, .. } => *enqueued_at,
        }
    }

    /// Short label for logs and listings
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Save { .. } => "save",
            Self::Delete { .. } => "delete",
        }
    }
}
