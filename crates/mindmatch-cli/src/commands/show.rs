use std::path::Path;

use chrono::Utc;

use crate::commands::common::{format_relative_time, normalize_entry_identifier, open_journal};
use crate::error::CliError;

pub async fn run_show(id: &str, db_path: &Path, offline: bool) -> Result<(), CliError> {
    let id = normalize_entry_identifier(id)?;
    let journal = open_journal(db_path, offline).await?;
    let entry = journal.engine.load_entry(&id).await?;

    println!(
        "{} | {} words | {}",
        entry.id(),
        entry.word_count(),
        format_relative_time(entry.last_modified(), Utc::now())
    );
    println!();
    println!("{}", entry.content());
    Ok(())
}
