//! Error types for mindmatch-core

use thiserror::Error;

use crate::auth::AuthError;
use crate::remote::RemoteError;

/// Result type alias using mindmatch-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mindmatch-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// `SQLite` error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry not found locally or remotely
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted record could not be decoded
    #[error("Local store record is corrupt: {0}")]
    LocalStoreCorrupt(String),

    /// Remote entry API error that could not be absorbed locally
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Identity capability error
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl Error {
    /// Whether the user must sign in again before remote operations can succeed.
    pub const fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::Remote(RemoteError::AuthRequired(_))
        )
    }
}
