use std::path::Path;

use mindmatch_core::db::LocalStore;

use crate::commands::common::{format_pending_lines, open_journal};
use crate::error::CliError;

pub async fn run_pending(clear: bool, db_path: &Path) -> Result<(), CliError> {
    // Never touches the remote, so skip the health probe
    let journal = open_journal(db_path, true).await?;
    let local = journal.engine.local();
    let queued = local.pending_queue()?;

    if clear {
        local.clear_pending_queue()?;
        println!("Discarded {} queued change(s)", queued.len());
        return Ok(());
    }

    if queued.is_empty() {
        println!("No queued changes.");
        return Ok(());
    }

    for line in format_pending_lines(&queued) {
        println!("{line}");
    }
    Ok(())
}
