use portkey_core::StorageError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AnalyticsError {
    #[error("link not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for AnalyticsError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}
