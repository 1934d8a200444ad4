//! Journal entry model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of characters shown in an entry preview before truncation
const PREVIEW_CHARS: usize = 150;

/// Opaque, client-generated identifier for a journal entry.
///
/// New ids are UUID v7 strings so they sort by creation time. Ids produced by
/// older clients (millisecond timestamps) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Generate a new unique, time-derived entry ID
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A journal entry.
///
/// The id is fixed at construction and the word count is always derived from
/// the content, so both are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredEntry")]
pub struct Entry {
    id: EntryId,
    content: String,
    word_count: usize,
    last_modified: DateTime<Utc>,
}

impl Entry {
    /// Create a new entry with a generated id and the given content
    #[must_use]
    pub fn new(content: impl AsRef<str>) -> Self {
        Self::with_id(EntryId::generate(), content, Utc::now())
    }

    /// Create an empty entry bound to a fresh id
    #[must_use]
    pub fn blank() -> Self {
        Self::new("")
    }

    /// Build an entry from known parts, recomputing the word count
    #[must_use]
    pub fn with_id(id: EntryId, content: impl AsRef<str>, last_modified: DateTime<Utc>) -> Self {
        let content = content.as_ref().trim().to_string();
        Self {
            word_count: count_words(&content),
            id,
            content,
            last_modified,
        }
    }

    pub const fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub const fn word_count(&self) -> usize {
        self.word_count
    }

    pub const fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Replace the content, recompute the word count and touch the timestamp
    pub fn set_content(&mut self, content: impl AsRef<str>) {
        self.content = content.as_ref().trim().to_string();
        self.word_count = count_words(&self.content);
        self.last_modified = Utc::now();
    }

    /// Check if the entry has no content (whitespace-only counts as empty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Content preview for entry lists, truncated with an ellipsis
    #[must_use]
    pub fn preview(&self) -> String {
        if self.content.chars().count() > PREVIEW_CHARS {
            let truncated: String = self.content.chars().take(PREVIEW_CHARS).collect();
            format!("{truncated}...")
        } else {
            self.content.clone()
        }
    }

    /// The partial body sent when updating an existing remote entry
    #[must_use]
    pub fn to_update(&self) -> EntryUpdate {
        EntryUpdate {
            content: self.content.clone(),
            word_count: self.word_count,
        }
    }
}

/// Partial entry payload for remote updates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryUpdate {
    pub content: String,
    pub word_count: usize,
}

/// Persisted shape of an entry. Any stored word count is ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    id: EntryId,
    #[serde(default)]
    content: String,
    #[serde(default, alias = "updatedAt", alias = "updated_at", alias = "last_modified")]
    last_modified: Option<DateTime<Utc>>,
}

impl From<StoredEntry> for Entry {
    fn from(value: StoredEntry) -> Self {
        Self::with_id(
            value.id,
            value.content,
            value.last_modified.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        )
    }
}

/// Count whitespace-separated words in text
///
/// # Examples
///
/// ```
/// use mindmatch_core::models::count_words;
///
/// assert_eq!(count_words("  dear   diary\ntoday  "), 3);
/// assert_eq!(count_words("   "), 0);
/// ```
#[must_use]
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
