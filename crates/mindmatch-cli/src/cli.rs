use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mindmatch")]
#[command(about = "Write in your MindMatch journal from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local journal database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Skip the remote entirely; writes are queued for the next sync
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replace the text of the current entry and save it
    Write {
        /// Entry text
        text: Vec<String>,
    },
    /// Start a fresh entry, optionally with text
    New {
        /// Entry text
        text: Vec<String>,
    },
    /// List entries, newest first
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print an entry and make it the current one
    Show {
        /// Entry ID
        id: String,
    },
    /// Delete an entry
    Delete {
        /// Entry ID
        id: String,
    },
    /// Replay queued changes against the remote
    Sync,
    /// Show connectivity, queued changes and the current entry
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or discard queued changes
    Pending {
        /// Discard every queued change without replaying it
        #[arg(long)]
        clear: bool,
    },
    /// Manage the stored access token
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store a bearer token in the system keychain
    Login {
        /// Access token issued by the identity provider
        #[arg(long)]
        token: String,
    },
    /// Remove the stored token
    Logout,
    /// Show where the access token comes from
    Status,
}
