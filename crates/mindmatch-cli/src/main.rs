//! MindMatch CLI - write in your journal from the terminal
//!
//! Every command works offline; changes made without a connection are queued
//! and replayed by `mindmatch sync` or the next online write.

mod auth;
mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::resolve_db_path;
use crate::commands::delete::run_delete;
use crate::commands::list::run_list;
use crate::commands::new::run_new;
use crate::commands::pending::run_pending;
use crate::commands::show::run_show;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::write::run_write;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "mindmatch=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let offline = cli.offline;

    match cli.command {
        Commands::Write { text } => run_write(&text, &db_path, offline).await?,
        Commands::New { text } => run_new(&text, &db_path, offline).await?,
        Commands::List { limit, json } => run_list(limit, json, &db_path, offline).await?,
        Commands::Show { id } => run_show(&id, &db_path, offline).await?,
        Commands::Delete { id } => run_delete(&id, &db_path, offline).await?,
        Commands::Sync => run_sync(&db_path, offline).await?,
        Commands::Status { json } => run_status(json, &db_path, offline).await?,
        Commands::Pending { clear } => run_pending(clear, &db_path).await?,
        Commands::Auth { command } => run_auth(command)?,
    }

    Ok(())
}
