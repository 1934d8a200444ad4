use std::path::Path;

use mindmatch_core::state::{SyncSnapshot, SyncStatus};

use crate::commands::common::open_journal;
use crate::error::CliError;

pub async fn run_status(as_json: bool, db_path: &Path, offline: bool) -> Result<(), CliError> {
    let journal = open_journal(db_path, offline).await?;
    let snapshot = journal.engine.status()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let remote = journal
        .engine
        .remote()
        .map_or("not configured", |remote| remote.entries_url());
    println!("Remote: {remote}");
    for line in format_status_lines(&snapshot) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_status_lines(snapshot: &SyncSnapshot) -> Vec<String> {
    let status = match snapshot.status {
        SyncStatus::Offline => "offline",
        SyncStatus::Syncing => "syncing",
        SyncStatus::Synced => "synced",
        SyncStatus::Pending => "pending",
    };
    let current = snapshot
        .current_entry_id
        .as_ref()
        .map_or_else(|| "(none)".to_string(), ToString::to_string);

    vec![
        format!("Status: {status}"),
        format!("Online: {}", if snapshot.online { "yes" } else { "no" }),
        format!("Pending changes: {}", snapshot.pending_changes),
        format!("Current entry: {current}"),
    ]
}
