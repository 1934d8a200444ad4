//! Sync engine: local-first saves, the offline queue and remote reconciliation.


use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;

use crate::connectivity::Transition;
use crate::db::LocalStore;
use crate::error::{Error, Result};
use crate::models::{Entry, EntryId, PendingChange};
use crate::remote::{RemoteEntries, RemoteError, RemoteResult, MAX_PAGE_SIZE};
use crate::state::{SyncSnapshot, SyncState, SyncStatus};

/// Why a change was queued instead of committed remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueReason {
    /// No connectivity
    Offline,
    /// Earlier queued changes could not be replayed yet
    Deferred,
    /// The remote rejected the bearer token
    AuthRequired(String),
    /// Transport, server or not-found failure
    Remote(RemoteError),
}

impl From<RemoteError> for QueueReason {
    fn from(error: RemoteError) -> Self {
        match error {
            RemoteError::AuthRequired(message) => Self::AuthRequired(message),
            other => Self::Remote(other),
        }
    }
}

/// Result of a save or delete. Every variant means the local store is updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The remote accepted the change
    Committed,
    /// No remote is configured
    LocalOnly,
    /// Saved locally and queued for replay
    Queued(QueueReason),
}

pub type SaveOutcome = WriteOutcome;
pub type DeleteOutcome = WriteOutcome;

impl WriteOutcome {
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Whether the user should be asked to sign in again
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::Queued(QueueReason::AuthRequired(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain is in flight
    AlreadyRunning,
    /// Offline or no remote configured; nothing was attempted
    Offline,
    /// Every queued change was replayed
    Drained { replayed: usize },
    /// Replay stopped at the first failure; the rest stays queued
    Halted {
        replayed: usize,
        remaining: usize,
        error: RemoteError,
    },
}

/// Where [`SyncEngine::load_current_entry`] found the entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Newest entry on the remote
    Remote,
    /// Remote was empty; local entries were pushed to it
    Migrated { count: usize },
    /// Current pointer or most recent local entry
    Local,
    /// Nothing stored anywhere; a blank entry was bound
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedEntry {
    pub entry: Entry,
    pub source: LoadSource,
    /// No entries exist anywhere yet
    pub is_new_user: bool,
}

/// Local intent still waiting in the queue for one entry
enum QueuedIntent {
    Save(Entry),
    Delete,
}

/// Orchestrates saves, deletes and loads across the local store and the
/// remote entry API.
///
/// Local writes always happen first. Remote failures never surface as errors;
/// they queue the change for replay by [`SyncEngine::drain_pending_queue`].
#[derive(Debug)]
pub struct SyncEngine<S, R> {
    local: S,
    remote: Option<R>,
    state: SyncState,
    draining: AtomicBool,
}

impl<S: LocalStore, R: RemoteEntries> SyncEngine<S, R> {
    /// Build an engine. `remote` is `None` for local-only operation.
    pub fn new(local: S, remote: Option<R>, state: SyncState) -> Self {
        match local.current_entry_id() {
            Ok(current) => state.set_current_entry_id(current),
            Err(error) => tracing::warn!("Could not read current entry pointer: {error}"),
        }

        Self {
            local,
            remote,
            state,
            draining: AtomicBool::new(false),
        }
    }

    pub const fn local(&self) -> &S {
        &self.local
    }

    pub const fn remote(&self) -> Option<&R> {
        self.remote.as_ref()
    }

    pub const fn state(&self) -> &SyncState {
        &self.state
    }

    /// Online with a remote configured
    pub fn is_online(&self) -> bool {
        self.remote.is_some() && self.state.is_online()
    }

    fn active_remote(&self) -> Option<&R> {
        self.remote.as_ref().filter(|_| self.state.is_online())
    }

    /// Save an entry.
    ///
    /// The local write is unconditional. Online, the entry is created or
    /// updated remotely; offline or on any remote failure it is queued.
    pub async fn save(&self, entry: &Entry) -> Result<SaveOutcome> {
        self.local.put(entry)?;

        let Some(remote) = self.remote.as_ref() else {
            return Ok(WriteOutcome::LocalOnly);
        };
        if !self.state.is_online() {
            self.local.enqueue_pending(PendingChange::save(entry.clone()))?;
            return Ok(WriteOutcome::Queued(QueueReason::Offline));
        }
        if !self.catch_up().await? {
            self.local.enqueue_pending(PendingChange::save(entry.clone()))?;
            return Ok(WriteOutcome::Queued(QueueReason::Deferred));
        }

        match push_save(remote, entry).await {
            Ok(()) => {
                tracing::debug!("Saved entry {} remotely", entry.id());
                Ok(WriteOutcome::Committed)
            }
            Err(error) => {
                tracing::warn!("Remote save failed for {}, queued: {error}", entry.id());
                self.local.enqueue_pending(PendingChange::save(entry.clone()))?;
                Ok(WriteOutcome::Queued(error.into()))
            }
        }
    }

    /// Delete an entry locally, then remotely or via the queue.
    ///
    /// A remote not-found counts as deleted.
    pub async fn delete_entry(&self, id: &EntryId) -> Result<DeleteOutcome> {
        self.local.remove(id)?;

        let Some(remote) = self.remote.as_ref() else {
            return Ok(WriteOutcome::LocalOnly);
        };
        if !self.state.is_online() {
            self.local.enqueue_pending(PendingChange::delete(id.clone()))?;
            return Ok(WriteOutcome::Queued(QueueReason::Offline));
        }
        if !self.catch_up().await? {
            self.local.enqueue_pending(PendingChange::delete(id.clone()))?;
            return Ok(WriteOutcome::Queued(QueueReason::Deferred));
        }

        match push_delete(remote, id).await {
            Ok(()) => {
                tracing::debug!("Deleted entry {id} remotely");
                Ok(WriteOutcome::Committed)
            }
            Err(error) => {
                tracing::warn!("Remote delete failed for {id}, queued: {error}");
                self.local.enqueue_pending(PendingChange::delete(id.clone()))?;
                Ok(WriteOutcome::Queued(error.into()))
            }
        }
    }

    /// Replay earlier queued changes before a direct write so remote order
    /// matches local order. Returns `false` if the queue is still non-empty.
    async fn catch_up(&self) -> Result<bool> {
        if self.local.pending_queue()?.is_empty() {
            return Ok(true);
        }
        Ok(matches!(
            self.drain_pending_queue().await?,
            DrainOutcome::Drained { .. }
        ))
    }

    /// Replay queued changes in order.
    ///
    /// Stops at the first failure, leaving that change and everything after
    /// it queued. Changes enqueued while the drain runs are picked up before
    /// it finishes. Only one drain runs at a time.
    pub async fn drain_pending_queue(&self) -> Result<DrainOutcome> {
        let Some(remote) = self.active_remote() else {
            return Ok(DrainOutcome::Offline);
        };
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Drain already in flight");
            return Ok(DrainOutcome::AlreadyRunning);
        }
        let _guard = DrainGuard(&self.draining);

        let mut replayed = 0;
        loop {
            let queue = self.local.pending_queue()?;
            if queue.is_empty() {
                break;
            }
            tracing::info!("Replaying {} pending changes", queue.len());

            for (index, change) in queue.iter().enumerate() {
                if let Err(error) = replay(remote, change).await {
                    self.local.remove_pending_prefix(index)?;
                    replayed += index;
                    let remaining = self.local.pending_queue()?.len();
                    tracing::warn!(
                        "Replay halted at {} {}: {error}. {remaining} changes remain queued",
                        change.kind(),
                        change.entry_id()
                    );
                    return Ok(DrainOutcome::Halted {
                        replayed,
                        remaining,
                        error,
                    });
                }
            }

            self.local.remove_pending_prefix(queue.len())?;
            replayed += queue.len();
        }

        if replayed > 0 {
            tracing::info!("Replayed {replayed} pending changes");
        }
        Ok(DrainOutcome::Drained { replayed })
    }

    /// Resolve the entry to edit on startup.
    ///
    /// Online: drain, then adopt the newest remote entry, migrating local
    /// entries first if the remote is empty. Otherwise the current pointer,
    /// the most recent local entry, or a fresh blank entry.
    pub async fn load_current_entry(&self) -> Result<LoadedEntry> {
        if let Some(remote) = self.active_remote() {
            match self.load_from_remote(remote).await {
                Ok(loaded) => return Ok(loaded),
                Err(Error::Remote(error)) => {
                    tracing::warn!("Loading from remote failed, using local entries: {error}");
                }
                Err(error) => return Err(error),
            }
        }
        self.load_from_local()
    }

    async fn load_from_remote(&self, remote: &R) -> Result<LoadedEntry> {
        if let DrainOutcome::Halted { error, .. } = self.drain_pending_queue().await? {
            tracing::warn!("Pending changes not fully replayed before load: {error}");
        }

        let page = remote.list(1, 0).await?;
        if let Some(newest) = page.entries.into_iter().next() {
            let entry = match self.queued_intent(newest.id())? {
                Some(QueuedIntent::Save(queued)) => queued,
                Some(QueuedIntent::Delete) => {
                    tracing::debug!(
                        "Newest remote entry {} is queued for deletion",
                        newest.id()
                    );
                    return self.load_from_local();
                }
                None => {
                    self.local.put(&newest)?;
                    newest
                }
            };
            self.bind_current_entry(entry.id())?;
            return Ok(LoadedEntry {
                entry,
                source: LoadSource::Remote,
                is_new_user: false,
            });
        }

        let local_entries = self.local.list()?;
        let Some(most_recent) = local_entries.first().cloned() else {
            return self.bind_fresh_entry();
        };

        tracing::info!(
            "Remote has no entries, migrating {} local entries",
            local_entries.len()
        );
        let mut migrated = 0;
        for entry in local_entries.iter().rev() {
            match remote.create(entry).await {
                Ok(_) => migrated += 1,
                Err(error) => {
                    tracing::warn!("Migration of {} failed, queued: {error}", entry.id());
                    self.local.enqueue_pending(PendingChange::save(entry.clone()))?;
                }
            }
        }

        self.bind_current_entry(most_recent.id())?;
        Ok(LoadedEntry {
            entry: most_recent,
            source: LoadSource::Migrated { count: migrated },
            is_new_user: false,
        })
    }

    fn load_from_local(&self) -> Result<LoadedEntry> {
        let pointed = match self.local.current_entry_id()? {
            Some(id) => self.local.get(&id)?,
            None => None,
        };

        let entry = match pointed {
            Some(entry) => Some(entry),
            None => self.local.list()?.into_iter().next(),
        };

        match entry {
            Some(entry) => {
                self.bind_current_entry(entry.id())?;
                Ok(LoadedEntry {
                    entry,
                    source: LoadSource::Local,
                    is_new_user: false,
                })
            }
            None => self.bind_fresh_entry(),
        }
    }

    fn bind_fresh_entry(&self) -> Result<LoadedEntry> {
        let entry = Entry::blank();
        self.bind_current_entry(entry.id())?;
        tracing::debug!("Starting fresh entry {}", entry.id());
        Ok(LoadedEntry {
            entry,
            source: LoadSource::Fresh,
            is_new_user: true,
        })
    }

    /// Load one entry by id.
    ///
    /// A queued local save wins over the remote copy and a queued delete
    /// hides it. Remote failures fall back to the local cache; absent
    /// everywhere is [`Error::NotFound`].
    pub async fn load_entry(&self, id: &EntryId) -> Result<Entry> {
        match self.queued_intent(id)? {
            Some(QueuedIntent::Save(queued)) => {
                self.bind_current_entry(id)?;
                return Ok(queued);
            }
            Some(QueuedIntent::Delete) => return Err(Error::NotFound(id.to_string())),
            None => {}
        }

        if let Some(remote) = self.active_remote() {
            match remote.get(id).await {
                Ok(entry) => {
                    self.local.put(&entry)?;
                    self.bind_current_entry(id)?;
                    return Ok(entry);
                }
                Err(error) if error.is_not_found() => {
                    tracing::debug!("Entry {id} not on remote, checking local cache");
                }
                Err(error) => {
                    tracing::warn!("Remote load of {id} failed, using local cache: {error}");
                }
            }
        }

        let entry = self
            .local
            .get(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.bind_current_entry(id)?;
        Ok(entry)
    }

    /// List entries, most recent first.
    ///
    /// Online, the local cache is refreshed from the first remote page.
    /// Entries with queued changes keep their local state.
    pub async fn list_entries(&self) -> Result<Vec<Entry>> {
        if let Some(remote) = self.active_remote() {
            match remote.list(MAX_PAGE_SIZE, 0).await {
                Ok(page) => {
                    let queued = self.queued_ids()?;
                    for entry in page.entries {
                        if !queued.contains(entry.id()) {
                            self.local.put(&entry)?;
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!("Could not refresh entries from remote: {error}");
                }
            }
        }
        self.local.list()
    }

    /// Whether any entry exists locally or, when online, remotely
    pub async fn has_any_entries(&self) -> Result<bool> {
        if !self.local.list()?.is_empty() {
            return Ok(true);
        }
        let Some(remote) = self.active_remote() else {
            return Ok(false);
        };
        match remote.list(1, 0).await {
            Ok(page) => Ok(page.total > 0 || !page.entries.is_empty()),
            Err(error) => {
                tracing::debug!("Could not check remote entries: {error}");
                Ok(false)
            }
        }
    }

    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.local.pending_queue()?.len())
    }

    /// Snapshot for sync indicators
    pub fn status(&self) -> Result<SyncSnapshot> {
        let pending_changes = self.pending_count()?;
        let online = self.is_online();
        let status = if !online {
            SyncStatus::Offline
        } else if self.draining.load(Ordering::Acquire) {
            SyncStatus::Syncing
        } else if pending_changes > 0 {
            SyncStatus::Pending
        } else {
            SyncStatus::Synced
        };

        Ok(SyncSnapshot {
            status,
            online,
            pending_changes,
            current_entry_id: self.state.current_entry_id(),
        })
    }

    /// Persist and publish the entry being edited
    pub fn bind_current_entry(&self, id: &EntryId) -> Result<()> {
        self.local.set_current_entry_id(id)?;
        self.state.set_current_entry_id(Some(id.clone()));
        Ok(())
    }

    /// What the latest queued change for `id` asks for
    fn queued_intent(&self, id: &EntryId) -> Result<Option<QueuedIntent>> {
        let queue = self.local.pending_queue()?;
        let latest = queue.into_iter().rev().find(|change| change.entry_id() == id);
        Ok(latest.map(|change| match change {
            PendingChange::Save { payload, .. } => QueuedIntent::Save(payload),
            PendingChange::Delete { .. } => QueuedIntent::Delete,
        }))
    }

    fn queued_ids(&self) -> Result<HashSet<EntryId>> {
        Ok(self
            .local
            .pending_queue()?
            .iter()
            .map(|change| change.entry_id().clone())
            .collect())
    }
}

impl<S, R> SyncEngine<S, R>
where
    S: LocalStore + 'static,
    R: RemoteEntries + 'static,
{
    /// Drain the queue on every offline to online transition.
    ///
    /// The task ends when the engine is dropped.
    pub fn watch_connectivity(self: &Arc<Self>) -> JoinHandle<()> {
        let mut listener = self.state.connectivity().subscribe();
        let engine: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            while let Some(transition) = listener.next().await {
                if transition != Transition::WentOnline {
                    continue;
                }
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                match engine.drain_pending_queue().await {
                    Ok(outcome) => tracing::debug!("Reconnect drain finished: {outcome:?}"),
                    Err(error) => tracing::warn!("Reconnect drain failed: {error}"),
                }
            }
        })
    }
}

struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Create or update depending on whether the remote already has the entry
async fn push_save<R: RemoteEntries>(remote: &R, entry: &Entry) -> RemoteResult<()> {
    if remote.exists(entry.id()).await? {
        remote.update(entry.id(), &entry.to_update()).await?;
    } else {
        remote.create(entry).await?;
    }
    Ok(())
}

async fn push_delete<R: RemoteEntries>(remote: &R, id: &EntryId) -> RemoteResult<()> {
    match remote.delete(id).await {
        Err(error) if error.is_not_found() => Ok(()),
        other => other,
    }
}

async fn replay<R: RemoteEntries>(remote: &R, change: &PendingChange) -> RemoteResult<()> {
    match change {
        PendingChange::Save { payload, .. } => push_save(remote, payload).await,
        PendingChange::Delete { payload, .. } => push_delete(remote, payload).await,
    }
}
