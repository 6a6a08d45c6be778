use portkey_core::{CoreError, StorageError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ShortenError {
    #[error("alias already exists: {0}")]
    AliasTaken(String),
    #[error("could not allocate a free short code after {0} attempts")]
    AllocationExhausted(u32),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("link not found: {0}")]
    NotFound(String),
    #[error("caller is not allowed to modify this link")]
    Forbidden,
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ShortenError {
    fn from(value: StorageError) -> Self {
        match value {
            // The store's uniqueness constraint is the authority; a losing
            // concurrent insert surfaces here.
            StorageError::Conflict(code) => Self::AliasTaken(code),
            other => Self::Storage(other),
        }
    }
}

impl From<CoreError> for ShortenError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidShortCode(message),
            CoreError::InvalidUrl(message) => Self::InvalidUrl(message),
        }
    }
}
