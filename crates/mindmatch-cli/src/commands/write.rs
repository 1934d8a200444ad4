use std::path::Path;

use mindmatch_core::sync::SaveOutcome;
use mindmatch_core::EntryId;

use crate::commands::common::{describe_write, open_journal, resolve_entry_text, Journal};
use crate::error::CliError;

pub async fn run_write(text: &[String], db_path: &Path, offline: bool) -> Result<(), CliError> {
    let text = resolve_entry_text(text)?;
    let journal = open_journal(db_path, offline).await?;
    let (id, outcome) = write_current_entry(&journal, &text).await?;

    println!("{id}");
    eprintln!("{}", describe_write(&outcome, "saved"));
    Ok(())
}

/// Replace the text of the current entry and save it
pub async fn write_current_entry(
    journal: &Journal,
    text: &str,
) -> Result<(EntryId, SaveOutcome), CliError> {
    let session = journal.session().await?;
    session.edit(text);
    let outcome = session.save_now().await?.ok_or(CliError::EmptyContent)?;
    Ok((session.current_entry_id(), outcome))
}
