//! Editing session for the current journal entry.
//!
//! Tracks unsaved changes against the last saved snapshot, debounces autosave
//! and gates entry switches behind a save prompt.


use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::db::LocalStore;
use crate::error::Result;
use crate::models::{count_words, Entry, EntryId};
use crate::remote::RemoteEntries;
use crate::sync::{DeleteOutcome, LoadSource, SaveOutcome, SyncEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Editor text matches the last save
    Clean,
    /// Editor text differs from the last save
    Dirty,
    /// A save is in flight
    Saving,
}

/// Why the session is about to leave the current entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwitchReason {
    NewEntry,
    LoadEntry(EntryId),
}

/// Asks the user whether unsaved text should be saved before switching.
pub trait SavePrompt {
    fn should_save(&self, reason: &SwitchReason) -> bool;
}

impl<F> SavePrompt for F
where
    F: Fn(&SwitchReason) -> bool,
{
    fn should_save(&self, reason: &SwitchReason) -> bool {
        self(reason)
    }
}

#[derive(Debug)]
struct SessionInner {
    entry: Entry,
    content: String,
    saved_snapshot: String,
    phase: SessionPhase,
    edit_version: u64,
    is_new_user: bool,
    autosave: Option<JoinHandle<()>>,
}

impl SessionInner {
    fn has_unsaved_changes(&self) -> bool {
        self.content.trim() != self.saved_snapshot
    }

    fn settle_phase(&mut self) {
        self.phase = if self.has_unsaved_changes() {
            SessionPhase::Dirty
        } else {
            SessionPhase::Clean
        };
    }

    fn cancel_autosave(&mut self) {
        if let Some(handle) = self.autosave.take() {
            handle.abort();
        }
    }

    /// Bind `entry` as the one being edited with a clean editor
    fn bind(&mut self, entry: Entry) {
        self.cancel_autosave();
        self.edit_version += 1;
        self.content = entry.content().to_string();
        self.saved_snapshot = self.content.clone();
        self.entry = entry;
        self.phase = SessionPhase::Clean;
    }
}

/// The entry currently open in the editor.
///
/// Must be used from within a Tokio runtime: edits spawn the autosave timer.
#[derive(Debug)]
pub struct EntrySession<S, R> {
    engine: Arc<SyncEngine<S, R>>,
    inner: Arc<Mutex<SessionInner>>,
    autosave_delay: Duration,
    source: LoadSource,
}

impl<S, R> EntrySession<S, R>
where
    S: LocalStore + 'static,
    R: RemoteEntries + 'static,
{
    /// Open the session on the engine's current entry
    pub async fn start(engine: Arc<SyncEngine<S, R>>, autosave_delay: Duration) -> Result<Self> {
        let loaded = engine.load_current_entry().await?;
        tracing::debug!(
            "Session opened on entry {} ({:?})",
            loaded.entry.id(),
            loaded.source
        );

        let content = loaded.entry.content().to_string();
        Ok(Self {
            engine,
            inner: Arc::new(Mutex::new(SessionInner {
                saved_snapshot: content.clone(),
                content,
                entry: loaded.entry,
                phase: SessionPhase::Clean,
                edit_version: 0,
                is_new_user: loaded.is_new_user,
                autosave: None,
            })),
            autosave_delay,
            source: loaded.source,
        })
    }

    pub const fn engine(&self) -> &Arc<SyncEngine<S, R>> {
        &self.engine
    }

    /// Where the entry bound at start came from
    pub const fn source(&self) -> LoadSource {
        self.source
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        lock_inner(&self.inner)
    }

    pub fn current_entry_id(&self) -> EntryId {
        self.lock().entry.id().clone()
    }

    pub fn content(&self) -> String {
        self.lock().content.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn is_new_user(&self) -> bool {
        self.lock().is_new_user
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.lock().has_unsaved_changes()
    }

    pub fn word_count(&self) -> usize {
        count_words(&self.lock().content)
    }

    /// Whether leaving now would lose non-empty unsaved text
    pub fn should_block_unload(&self) -> bool {
        let inner = self.lock();
        inner.has_unsaved_changes() && !inner.content.trim().is_empty()
    }

    /// Replace the editor text and restart the autosave timer
    pub fn edit(&self, text: impl Into<String>) {
        let mut inner = self.lock();
        inner.content = text.into();
        inner.edit_version += 1;
        if inner.phase != SessionPhase::Saving {
            inner.settle_phase();
        }

        inner.cancel_autosave();
        if inner.is_new_user || !inner.has_unsaved_changes() {
            return;
        }

        let deadline = Instant::now() + self.autosave_delay;
        let version = inner.edit_version;
        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.inner);

        inner.autosave = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut inner = lock_inner(&shared);
                if inner.edit_version != version {
                    return;
                }
                // Detach so later edits cannot abort the save itself
                inner.autosave = None;
            }
            match persist(&engine, &shared).await {
                Ok(Some(outcome)) => tracing::debug!("Autosaved: {outcome:?}"),
                Ok(None) => {}
                Err(error) => tracing::warn!("Autosave failed: {error}"),
            }
        }));
    }

    /// Save immediately. Empty content is a no-op and returns `None`.
    pub async fn save_now(&self) -> Result<Option<SaveOutcome>> {
        self.lock().cancel_autosave();
        let outcome = persist(&self.engine, &self.inner).await?;
        if outcome.is_some() {
            self.lock().is_new_user = false;
        }
        Ok(outcome)
    }

    /// Start a fresh entry, offering to save unsaved text first.
    pub async fn new_entry(&self, prompt: &impl SavePrompt) -> Result<EntryId> {
        self.flush_before_switch(&SwitchReason::NewEntry, prompt)
            .await?;

        let entry = Entry::blank();
        self.engine.bind_current_entry(entry.id())?;
        let id = entry.id().clone();
        self.lock().bind(entry);
        tracing::debug!("Started new entry {id}");
        Ok(id)
    }

    /// Switch to another entry, offering to save unsaved text first.
    pub async fn load_entry(&self, id: &EntryId, prompt: &impl SavePrompt) -> Result<Entry> {
        self.flush_before_switch(&SwitchReason::LoadEntry(id.clone()), prompt)
            .await?;

        let entry = self.engine.load_entry(id).await?;
        self.lock().bind(entry.clone());
        Ok(entry)
    }

    /// Delete an entry. Deleting the open entry leaves a fresh blank one.
    ///
    /// The editor moves off the entry before the delete is sent, so a pending
    /// autosave cannot write it back.
    pub async fn delete_entry(&self, id: &EntryId) -> Result<DeleteOutcome> {
        let replacement = {
            let mut inner = self.lock();
            if inner.entry.id() == id {
                let entry = Entry::blank();
                let blank_id = entry.id().clone();
                inner.bind(entry);
                Some(blank_id)
            } else {
                None
            }
        };
        if let Some(blank_id) = replacement {
            self.engine.bind_current_entry(&blank_id)?;
        }

        let outcome = self.engine.delete_entry(id).await?;

        if !self.engine.has_any_entries().await? {
            self.lock().is_new_user = true;
        }
        Ok(outcome)
    }

    pub async fn list_entries(&self) -> Result<Vec<Entry>> {
        self.engine.list_entries().await
    }

    /// Cancel the pending autosave
    pub fn shutdown(&self) {
        self.lock().cancel_autosave();
    }

    async fn flush_before_switch(
        &self,
        reason: &SwitchReason,
        prompt: &impl SavePrompt,
    ) -> Result<()> {
        let (dirty, empty) = {
            let mut inner = self.lock();
            inner.cancel_autosave();
            (inner.has_unsaved_changes(), inner.content.trim().is_empty())
        };

        if empty {
            return Ok(());
        }
        if !dirty || prompt.should_save(reason) {
            self.save_now().await?;
        }
        Ok(())
    }
}

impl<S, R> Drop for EntrySession<S, R> {
    fn drop(&mut self) {
        lock_inner(&self.inner).cancel_autosave();
    }
}

fn lock_inner(inner: &Mutex<SessionInner>) -> MutexGuard<'_, SessionInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Save the editor text through the engine and update the snapshot
async fn persist<S, R>(
    engine: &SyncEngine<S, R>,
    shared: &Mutex<SessionInner>,
) -> Result<Option<SaveOutcome>>
where
    S: LocalStore,
    R: RemoteEntries,
{
    let entry = {
        let mut inner = lock_inner(shared);
        if inner.content.trim().is_empty() {
            return Ok(None);
        }
        let mut entry = inner.entry.clone();
        entry.set_content(&inner.content);
        inner.phase = SessionPhase::Saving;
        entry
    };

    let result = engine.save(&entry).await;

    let mut inner = lock_inner(shared);
    let still_current = inner.entry.id() == entry.id();
    match result {
        Ok(outcome) => {
            if still_current {
                inner.saved_snapshot = entry.content().to_string();
                inner.entry = entry;
                inner.settle_phase();
            }
            Ok(Some(outcome))
        }
        Err(error) => {
            if still_current {
                inner.settle_phase();
            }
            Err(error)
        }
    }
}
