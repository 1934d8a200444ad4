//! Local record store for entries, the current-entry pointer and the pending
//! change queue

use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Database;
use crate::config::DEFAULT_NAMESPACE;
use crate::error::{Error, Result};
use crate::models::{Entry, EntryId, PendingChange};

const ENTRIES_KEY: &str = "entries";
const PENDING_CHANGES_KEY: &str = "pending_changes";
const CURRENT_ENTRY_KEY: &str = "current_entry";

/// Synchronous persistence used by the sync engine.
///
/// Malformed stored data reads as empty. It is logged and overwritten by the
/// next write rather than surfaced as an error.
pub trait LocalStore: Send + Sync {
    /// Get an entry by id
    fn get(&self, id: &EntryId) -> Result<Option<Entry>>;

    /// List all entries, most recently modified first
    fn list(&self) -> Result<Vec<Entry>>;

    /// Insert or replace an entry by id
    fn put(&self, entry: &Entry) -> Result<()>;

    /// Remove an entry. Removing an unknown id is a no-op.
    fn remove(&self, id: &EntryId) -> Result<()>;

    /// Queued changes in enqueue order
    fn pending_queue(&self) -> Result<Vec<PendingChange>>;

    /// Append a change to the queue
    fn enqueue_pending(&self, change: PendingChange) -> Result<()>;

    /// Drop the first `count` queued changes
    fn remove_pending_prefix(&self, count: usize) -> Result<()>;

    /// Drop every queued change
    fn clear_pending_queue(&self) -> Result<()>;

    /// Persisted pointer to the entry being edited
    fn current_entry_id(&self) -> Result<Option<EntryId>>;

    fn set_current_entry_id(&self, id: &EntryId) -> Result<()>;
}

/// [`LocalStore`] backed by namespaced JSON records in `SQLite`
#[derive(Debug, Clone)]
pub struct SqliteLocalStore {
    db: Arc<Database>,
    namespace: String,
}

impl SqliteLocalStore {
    pub fn new(db: Arc<Database>, namespace: impl Into<String>) -> Self {
        Self {
            db,
            namespace: namespace.into(),
        }
    }

    /// Open a store on a file under the default namespace
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(Arc::new(Database::open(path)?), DEFAULT_NAMESPACE))
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(
            Arc::new(Database::open_in_memory()?),
            DEFAULT_NAMESPACE,
        ))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn read<T: DeserializeOwned>(&self, conn: &Connection, key: &str) -> Result<Option<T>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM records WHERE namespace = ? AND key = ?",
                params![self.namespace, key],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                let error = Error::LocalStoreCorrupt(format!("{}/{key}: {error}", self.namespace));
                tracing::warn!("{error}. Treating record as empty.");
                Ok(None)
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, conn: &Connection, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        conn.execute(
            "INSERT INTO records (namespace, key, value, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(namespace, key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
            params![
                self.namespace,
                key,
                raw,
                chrono::Utc::now().timestamp_millis()
            ],
        )?;
        Ok(())
    }

    fn read_entries(&self, conn: &Connection) -> Result<Vec<Entry>> {
        Ok(self.read(conn, ENTRIES_KEY)?.unwrap_or_default())
    }

    fn read_queue(&self, conn: &Connection) -> Result<Vec<PendingChange>> {
        Ok(self.read(conn, PENDING_CHANGES_KEY)?.unwrap_or_default())
    }

    /// Read-modify-write the entry collection inside one transaction
    fn update_entries(&self, f: impl FnOnce(&mut Vec<Entry>)) -> Result<()> {
        self.db.with_connection(|conn| {
            let tx = conn.transaction()?;
            let mut entries = self.read_entries(&tx)?;
            f(&mut entries);
            self.write(&tx, ENTRIES_KEY, &entries)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn update_queue(&self, f: impl FnOnce(&mut Vec<PendingChange>)) -> Result<()> {
        self.db.with_connection(|conn| {
            let tx = conn.transaction()?;
            let mut queue = self.read_queue(&tx)?;
            f(&mut queue);
            self.write(&tx, PENDING_CHANGES_KEY, &queue)?;
            tx.commit()?;
            Ok(())
        })
    }
}

impl LocalStore for SqliteLocalStore {
    fn get(&self, id: &EntryId) -> Result<Option<Entry>> {
        let entries = self.db.with_connection(|conn| self.read_entries(conn))?;
        Ok(entries.into_iter().find(|entry| entry.id() == id))
    }

    fn list(&self) -> Result<Vec<Entry>> {
        let mut entries = self.db.with_connection(|conn| self.read_entries(conn))?;
        entries.sort_by(|a, b| b.last_modified().cmp(&a.last_modified()));
        Ok(entries)
    }

    fn put(&self, entry: &Entry) -> Result<()> {
        self.update_entries(|entries| {
            if let Some(existing) = entries.iter_mut().find(|e| e.id() == entry.id()) {
                *existing = entry.clone();
            } else {
                entries.push(entry.clone());
            }
        })
    }

    fn remove(&self, id: &EntryId) -> Result<()> {
        self.update_entries(|entries| entries.retain(|entry| entry.id() != id))
    }

    fn pending_queue(&self) -> Result<Vec<PendingChange>> {
        self.db.with_connection(|conn| self.read_queue(conn))
    }

    fn enqueue_pending(&self, change: PendingChange) -> Result<()> {
        tracing::debug!("Queued {} for entry {}", change.kind(), change.entry_id());
        self.update_queue(|queue| queue.push(change))
    }

    fn remove_pending_prefix(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        self.update_queue(|queue| {
            queue.drain(..count.min(queue.len()));
        })
    }

    fn clear_pending_queue(&self) -> Result<()> {
        self.db.with_connection(|conn| {
            self.write(conn, PENDING_CHANGES_KEY, &Vec::<PendingChange>::new())
        })
    }

    fn current_entry_id(&self) -> Result<Option<EntryId>> {
        self.db
            .with_connection(|conn| self.read(conn, CURRENT_ENTRY_KEY))
    }

    fn set_current_entry_id(&self, id: &EntryId) -> Result<()> {
        self.db
            .with_connection(|conn| self.write(conn, CURRENT_ENTRY_KEY, id))
    }
}
