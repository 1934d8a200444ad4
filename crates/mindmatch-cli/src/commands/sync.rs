use std::path::Path;

use mindmatch_core::sync::DrainOutcome;
use mindmatch_core::RemoteError;

use crate::commands::common::{open_journal, Journal};
use crate::error::CliError;

pub async fn run_sync(db_path: &Path, offline: bool) -> Result<(), CliError> {
    let journal = open_journal(db_path, offline).await?;
    let outcome = sync_journal(&journal).await?;
    println!("{}", describe_drain(&outcome));

    if let DrainOutcome::Halted { error, .. } = outcome {
        if matches!(error, RemoteError::AuthRequired(_)) {
            eprintln!("Run `mindmatch auth login` and sync again.");
        }
    }
    Ok(())
}

pub async fn sync_journal(journal: &Journal) -> Result<DrainOutcome, CliError> {
    if journal.engine.remote().is_none() {
        return Err(CliError::SyncNotConfigured);
    }
    Ok(journal.engine.drain_pending_queue().await?)
}

pub fn describe_drain(outcome: &DrainOutcome) -> String {
    match outcome {
        DrainOutcome::AlreadyRunning => "Sync already in progress".to_string(),
        DrainOutcome::Offline => "Offline: queued changes stay on this device".to_string(),
        DrainOutcome::Drained { replayed: 0 } => "Nothing to sync".to_string(),
        DrainOutcome::Drained { replayed } => format!("Synced {replayed} queued change(s)"),
        DrainOutcome::Halted {
            replayed,
            remaining,
            error,
        } => format!(
            "Synced {replayed} change(s), {remaining} still queued: {error}"
        ),
    }
}
