//! mindmatch-core - Core library for the MindMatch journal
//!
//! This crate contains the offline-first journal sync core: the entry models,
//! the local record store, the connectivity monitor, the authenticated remote
//! client, the sync engine and the entry session controller used by every
//! MindMatch front-end.

pub mod auth;
pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod session;
pub mod state;
pub mod sync;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use models::{Entry, EntryId, PendingChange};
pub use remote::{RemoteError, RemoteResult};
