use std::path::Path;

use mindmatch_core::db::LocalStore;

use crate::commands::common::{
    entry_to_list_item, format_entry_lines, open_journal, EntryListItem,
};
use crate::error::CliError;

pub async fn run_list(
    limit: usize,
    as_json: bool,
    db_path: &Path,
    offline: bool,
) -> Result<(), CliError> {
    let journal = open_journal(db_path, offline).await?;
    let mut entries = journal.engine.list_entries().await?;
    entries.truncate(limit);
    let queued = journal.engine.local().pending_queue()?;

    if as_json {
        let json_items = entries
            .iter()
            .map(|entry| entry_to_list_item(entry, &queued))
            .collect::<Vec<EntryListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if entries.is_empty() {
        println!("No journal entries yet. Start one with `mindmatch write`.");
    } else {
        for line in format_entry_lines(&entries, &queued) {
            println!("{line}");
        }
    }

    Ok(())
}
