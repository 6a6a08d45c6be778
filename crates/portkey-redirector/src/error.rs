use portkey_core::StorageError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RedirectError {
    /// The short code was never assigned (or is already archived).
    #[error("short code not found: {0}")]
    NotFound(String),
    /// The link exists but lapsed. Distinct from [`NotFound`] so clients
    /// can tell "never existed" from "existed, expired".
    ///
    /// [`NotFound`]: RedirectError::NotFound
    #[error("link has expired: {0}")]
    Gone(String),
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for RedirectError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}
