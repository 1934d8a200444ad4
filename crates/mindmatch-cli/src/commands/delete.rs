use std::path::Path;

use crate::commands::common::{describe_write, normalize_entry_identifier, open_journal};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path, offline: bool) -> Result<(), CliError> {
    let id = normalize_entry_identifier(id)?;
    let journal = open_journal(db_path, offline).await?;
    let session = journal.session().await?;
    let outcome = session.delete_entry(&id).await?;

    println!("{id}");
    eprintln!("{}", describe_write(&outcome, "deleted"));
    Ok(())
}
