use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] mindmatch_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No entry text provided")]
    EmptyContent,
    #[error("Entry ID cannot be empty")]
    EmptyEntryId,
    #[error("Access token cannot be empty")]
    EmptyToken,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Sync is not configured. Set MINDMATCH_API_URL or api_base_url in the config file.")]
    SyncNotConfigured,
}

impl From<mindmatch_core::RemoteError> for CliError {
    fn from(error: mindmatch_core::RemoteError) -> Self {
        Self::Core(error.into())
    }
}
