use std::path::Path;

use mindmatch_core::session::SwitchReason;
use mindmatch_core::sync::SaveOutcome;
use mindmatch_core::EntryId;

use crate::commands::common::{describe_write, normalize_content, open_journal, Journal};
use crate::error::CliError;

pub async fn run_new(text: &[String], db_path: &Path, offline: bool) -> Result<(), CliError> {
    let text = normalize_content(&text.join(" "));
    let journal = open_journal(db_path, offline).await?;
    let (id, outcome) = start_new_entry(&journal, text.as_deref()).await?;

    println!("{id}");
    if let Some(outcome) = outcome {
        eprintln!("{}", describe_write(&outcome, "saved"));
    }
    Ok(())
}

/// Start a blank entry and optionally save `text` into it.
///
/// The CLI never holds unsaved edits between invocations, so the save
/// prompt always accepts.
pub async fn start_new_entry(
    journal: &Journal,
    text: Option<&str>,
) -> Result<(EntryId, Option<SaveOutcome>), CliError> {
    let session = journal.session().await?;
    let id = session.new_entry(&|_: &SwitchReason| true).await?;

    let outcome = match text {
        Some(text) => {
            session.edit(text);
            session.save_now().await?
        }
        None => None,
    };
    Ok((id, outcome))
}
