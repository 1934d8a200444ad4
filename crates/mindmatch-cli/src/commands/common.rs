use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mindmatch_core::auth::StaticTokenProvider;
use mindmatch_core::config::JournalConfig;
use mindmatch_core::connectivity::ConnectivityMonitor;
use mindmatch_core::db::{Database, SqliteLocalStore};
use mindmatch_core::remote::HttpRemoteClient;
use mindmatch_core::session::EntrySession;
use mindmatch_core::state::SyncState;
use mindmatch_core::sync::{QueueReason, SyncEngine, WriteOutcome};
use mindmatch_core::{Entry, EntryId, PendingChange};
use serde::Serialize;

use crate::auth::TokenStore;
use crate::error::CliError;

pub const ENV_DB_PATH: &str = "MINDMATCH_DB_PATH";
pub const ENV_CONFIG_PATH: &str = "MINDMATCH_CONFIG";

pub type CliRemote = HttpRemoteClient<StaticTokenProvider>;
pub type CliEngine = SyncEngine<SqliteLocalStore, CliRemote>;
pub type CliSession = EntrySession<SqliteLocalStore, CliRemote>;

/// An opened journal: the sync engine plus the config it was built from
pub struct Journal {
    pub engine: Arc<CliEngine>,
    pub config: JournalConfig,
}

impl Journal {
    /// Open `db_path` with a remote built from `config`.
    ///
    /// Connectivity is probed once against the health endpoint unless
    /// `offline` is set.
    pub async fn open(
        config: JournalConfig,
        db_path: &Path,
        offline: bool,
        identity: StaticTokenProvider,
    ) -> Result<Self, CliError> {
        let db = Arc::new(Database::open(db_path)?);
        let local = SqliteLocalStore::new(db, config.namespace.clone());

        let remote = if config.api_base_url.is_some() {
            Some(HttpRemoteClient::new(&config, identity)?)
        } else {
            None
        };

        let online = match (&remote, offline) {
            (Some(remote), false) => remote.probe_health().await,
            _ => false,
        };
        if remote.is_some() && !online && !offline {
            tracing::info!("Remote unreachable; working offline");
        }

        let engine = SyncEngine::new(
            local,
            remote,
            SyncState::new(ConnectivityMonitor::new(online)),
        );
        Ok(Self {
            engine: Arc::new(engine),
            config,
        })
    }

    /// Open the session on the current entry
    pub async fn session(&self) -> Result<CliSession, CliError> {
        Ok(EntrySession::start(Arc::clone(&self.engine), self.config.autosave_delay()).await?)
    }
}

/// Resolve config and credentials from the environment and open the journal
pub async fn open_journal(db_path: &Path, offline: bool) -> Result<Journal, CliError> {
    let config = load_config(&resolve_config_path())?;
    Journal::open(config, db_path, offline, TokenStore::default().identity()).await
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os(ENV_DB_PATH).map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mindmatch")
        .join("journal.db")
}

pub fn resolve_config_path() -> PathBuf {
    env::var_os(ENV_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mindmatch")
        .join("config.json")
}

/// Read the config file if present, then apply environment overrides
pub fn load_config(path: &Path) -> Result<JournalConfig, CliError> {
    read_config_file(path)?
        .with_env_overrides()
        .map_err(|error| CliError::Config(error.to_string()))
}

pub fn read_config_file(path: &Path) -> Result<JournalConfig, CliError> {
    if !path.exists() {
        return Ok(JournalConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    JournalConfig::from_json(&raw)
        .map_err(|error| CliError::Config(format!("{}: {error}", path.display())))
}

#[derive(Debug, Serialize)]
pub struct EntryListItem {
    pub id: String,
    pub preview: String,
    pub content: String,
    pub word_count: usize,
    pub last_modified: DateTime<Utc>,
    pub relative_time: String,
    pub pending: bool,
}

pub fn entry_to_list_item(entry: &Entry, queued: &[PendingChange]) -> EntryListItem {
    EntryListItem {
        id: entry.id().to_string(),
        preview: entry_preview(entry, 60),
        content: entry.content().to_string(),
        word_count: entry.word_count(),
        last_modified: entry.last_modified(),
        relative_time: format_relative_time(entry.last_modified(), Utc::now()),
        pending: is_queued(entry.id(), queued),
    }
}

fn is_queued(id: &EntryId, queued: &[PendingChange]) -> bool {
    queued.iter().any(|change| change.entry_id() == id)
}

pub fn entry_preview(entry: &Entry, max_chars: usize) -> String {
    let first_line = entry.content().lines().next().unwrap_or("").trim();
    if first_line.chars().count() > max_chars {
        format!(
            "{}...",
            first_line.chars().take(max_chars).collect::<String>()
        )
    } else {
        first_line.to_string()
    }
}

pub fn short_id(id: &EntryId) -> String {
    id.as_str().chars().take(13).collect()
}

pub fn format_entry_lines(entries: &[Entry], queued: &[PendingChange]) -> Vec<String> {
    let now = Utc::now();
    entries
        .iter()
        .map(|entry| {
            let marker = if is_queued(entry.id(), queued) { "*" } else { " " };
            format!(
                "{marker} {}  {:<40}  {:>4}w  ({})",
                short_id(entry.id()),
                entry_preview(entry, 40),
                entry.word_count(),
                format_relative_time(entry.last_modified(), now)
            )
        })
        .collect()
}

pub fn format_pending_lines(queued: &[PendingChange]) -> Vec<String> {
    let now = Utc::now();
    queued
        .iter()
        .enumerate()
        .map(|(index, change)| {
            format!(
                "{:>3}. {:<6} {}  ({})",
                index + 1,
                change.kind(),
                change.entry_id(),
                format_relative_time(change.enqueued_at(), now)
            )
        })
        .collect()
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - timestamp).num_milliseconds().max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// One line telling the user where a write ended up. `action` is the past
/// tense verb for the local write, e.g. "saved".
pub fn describe_write(outcome: &WriteOutcome, action: &str) -> String {
    match outcome {
        WriteOutcome::Committed => "synced".to_string(),
        WriteOutcome::LocalOnly => format!("{action} locally (no remote configured)"),
        WriteOutcome::Queued(QueueReason::Offline) => {
            format!("{action} locally, will sync when online")
        }
        WriteOutcome::Queued(QueueReason::Deferred) => {
            format!("{action} locally, queued behind earlier changes")
        }
        WriteOutcome::Queued(QueueReason::AuthRequired(_)) => {
            format!("{action} locally, run `mindmatch auth login` to sync")
        }
        WriteOutcome::Queued(QueueReason::Remote(error)) => {
            format!("{action} locally, queued for retry ({error})")
        }
    }
}

pub fn resolve_entry_text(text_parts: &[String]) -> Result<String, CliError> {
    normalize_content(&text_parts.join(" ")).ok_or(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_entry_identifier(id: &str) -> Result<EntryId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyEntryId);
    }
    Ok(EntryId::from(trimmed))
}
