//! In-memory remote used by unit tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::RwLock;

use crate::models::{Entry, EntryId, EntryUpdate};
use crate::remote::{EntryPage, RemoteEntries, RemoteError, RemoteResult};

/// Remote entry store with switchable failures and a call log.
///
/// Operations wait on `gate` so tests can hold them mid-flight by taking the
/// write half.
#[derive(Debug, Default)]
pub struct FakeRemote {
    entries: Mutex<BTreeMap<EntryId, Entry>>,
    calls: Mutex<Vec<String>>,
    failing_ids: Mutex<HashSet<EntryId>>,
    unreachable: AtomicBool,
    signed_out: AtomicBool,
    reject_updates: AtomicBool,
    pub gate: RwLock<()>,
}

impl FakeRemote {
    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let remote = Self::default();
        for entry in entries {
            remote.insert(entry);
        }
        remote
    }

    pub fn insert(&self, entry: Entry) {
        lock(&self.entries).insert(entry.id().clone(), entry);
    }

    pub fn entry(&self, id: &EntryId) -> Option<Entry> {
        lock(&self.entries).get(id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Every operation fails with a network error
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Every operation fails with `AuthRequired`
    pub fn set_signed_out(&self, signed_out: bool) {
        self.signed_out.store(signed_out, Ordering::SeqCst);
    }

    /// Updates fail with `NotFoundOrUnauthorized`
    pub fn set_reject_updates(&self, reject: bool) {
        self.reject_updates.store(reject, Ordering::SeqCst);
    }

    /// Operations touching `id` fail with a server error
    pub fn fail_for(&self, id: &EntryId) {
        lock(&self.failing_ids).insert(id.clone());
    }

    pub fn recover(&self, id: &EntryId) {
        lock(&self.failing_ids).remove(id);
    }

    async fn begin(&self, call: String, id: Option<&EntryId>) -> RemoteResult<()> {
        let _open = self.gate.read().await;
        lock(&self.calls).push(call);

        if self.signed_out.load(Ordering::SeqCst) {
            return Err(RemoteError::AuthRequired("signed out".to_string()));
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RemoteError::Network("connection refused".to_string()));
        }
        if let Some(id) = id {
            if lock(&self.failing_ids).contains(id) {
                return Err(RemoteError::Server(format!("HTTP 500 for {id}")));
            }
        }
        Ok(())
    }
}

impl RemoteEntries for FakeRemote {
    async fn create(&self, entry: &Entry) -> RemoteResult<Entry> {
        self.begin(format!("create {}", entry.id()), Some(entry.id()))
            .await?;
        self.insert(entry.clone());
        Ok(entry.clone())
    }

    async fn update(&self, id: &EntryId, update: &EntryUpdate) -> RemoteResult<Entry> {
        self.begin(format!("update {id}"), Some(id)).await?;
        if self.reject_updates.load(Ordering::SeqCst) {
            return Err(RemoteError::NotFoundOrUnauthorized(id.to_string()));
        }
        let mut entries = lock(&self.entries);
        let Some(entry) = entries.get_mut(id) else {
            return Err(RemoteError::NotFoundOrUnauthorized(id.to_string()));
        };
        entry.set_content(&update.content);
        Ok(entry.clone())
    }

    async fn get(&self, id: &EntryId) -> RemoteResult<Entry> {
        self.begin(format!("get {id}"), Some(id)).await?;
        self.entry(id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn list(&self, limit: u32, offset: u32) -> RemoteResult<EntryPage> {
        self.begin(format!("list {limit} {offset}"), None).await?;
        let mut entries: Vec<Entry> = lock(&self.entries).values().cloned().collect();
        entries.sort_by(|a, b| b.last_modified().cmp(&a.last_modified()));
        let total = entries.len() as u64;
        let entries = entries
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(EntryPage { entries, total })
    }

    async fn delete(&self, id: &EntryId) -> RemoteResult<()> {
        self.begin(format!("delete {id}"), Some(id)).await?;
        lock(&self.entries)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
