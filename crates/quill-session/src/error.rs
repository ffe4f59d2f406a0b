//! Session error types.

use thiserror::Error;

/// Error type for operations that propagate failures to the caller
/// (privileged mutations). Login, register, and restore never produce
/// these; they resolve to outcomes instead.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No bearer token is resident
    #[error("Not authenticated")]
    NotAuthenticated,

    /// API request failure
    #[error("API error: {0}")]
    Api(#[from] quill_api::ApiError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] quill_storage::StorageError),
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
