//! Data models for the MindMatch journal

mod entry;
mod pending;

pub use entry::{count_words, Entry, EntryId, EntryUpdate};
pub use pending::PendingChange;
