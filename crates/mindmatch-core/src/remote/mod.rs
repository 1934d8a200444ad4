//! Authenticated access to the remote entry API.

mod http;

use std::future::Future;

use thiserror::Error;

use crate::models::{Entry, EntryId, EntryUpdate};

pub use http::HttpRemoteClient;

/// Largest page the entry API serves
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Authentication required: {0}")]
    AuthRequired(String),
    #[error("Remote entry not found: {0}")]
    NotFound(String),
    #[error("Remote entry not found or unauthorized: {0}")]
    NotFoundOrUnauthorized(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
}

impl RemoteError {
    /// Whether the entry is simply absent on the remote side
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NotFoundOrUnauthorized(_))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// One page of remote entries, newest first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    pub total: u64,
}

/// Remote entry operations used by the sync engine.
///
/// Every call needs a bearer token from the identity capability; without one
/// it fails with [`RemoteError::AuthRequired`].
pub trait RemoteEntries: Send + Sync {
    /// Wait for prerequisites such as identity readiness
    fn prepare(&self) -> impl Future<Output = RemoteResult<()>> + Send {
        async { Ok(()) }
    }

    /// Whether the entry exists remotely. Not-found reads as `false`.
    fn exists(&self, id: &EntryId) -> impl Future<Output = RemoteResult<bool>> + Send {
        async move {
            match self.get(id).await {
                Ok(_) => Ok(true),
                Err(RemoteError::NotFound(_)) => Ok(false),
                Err(error) => Err(error),
            }
        }
    }

    /// Create an entry, preserving its client-generated id
    fn create(&self, entry: &Entry) -> impl Future<Output = RemoteResult<Entry>> + Send;

    /// Apply a partial update
    fn update(
        &self,
        id: &EntryId,
        update: &EntryUpdate,
    ) -> impl Future<Output = RemoteResult<Entry>> + Send;

    fn get(&self, id: &EntryId) -> impl Future<Output = RemoteResult<Entry>> + Send;

    /// List entries newest first
    fn list(&self, limit: u32, offset: u32) -> impl Future<Output = RemoteResult<EntryPage>> + Send;

    fn delete(&self, id: &EntryId) -> impl Future<Output = RemoteResult<()>> + Send;
}

impl<T: RemoteEntries + ?Sized> RemoteEntries for std::sync::Arc<T> {
    fn prepare(&self) -> impl Future<Output = RemoteResult<()>> + Send {
        (**self).prepare()
    }

    fn exists(&self, id: &EntryId) -> impl Future<Output = RemoteResult<bool>> + Send {
        (**self).exists(id)
    }

    fn create(&self, entry: &Entry) -> impl Future<Output = RemoteResult<Entry>> + Send {
        (**self).create(entry)
    }

    fn update(
        &self,
        id: &EntryId,
        update: &EntryUpdate,
    ) -> impl Future<Output = RemoteResult<Entry>> + Send {
        (**self).update(id, update)
    }

    fn get(&self, id: &EntryId) -> impl Future<Output = RemoteResult<Entry>> + Send {
        (**self).get(id)
    }

    fn list(&self, limit: u32, offset: u32) -> impl Future<Output = RemoteResult<EntryPage>> + Send {
        (**self).list(limit, offset)
    }

    fn delete(&self, id: &EntryId) -> impl Future<Output = RemoteResult<()>> + Send {
        (**self).delete(id)
    }
}
