use thiserror::Error;

use crate::request::MalformedRequest;
use crate::store::StoreError;

// Errors surfaced to whoever drives the sorter (transport layer, CLI)
#[derive(Error, Debug)]
pub enum SortError {
    #[error(transparent)]
    MalformedRequest(#[from] MalformedRequest),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    // detail is for logs only
    #[error("Internal error.")]
    Internal(String),
}

impl SortError {
    /// HTTP status a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            SortError::MalformedRequest(_) => 400,
            SortError::Storage(_) => 503,
            SortError::Internal(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, SortError::MalformedRequest(_))
    }
}
