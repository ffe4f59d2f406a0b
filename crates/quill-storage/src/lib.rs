//! Durable key-value storage for the Quill client.
//!
//! This crate provides the persistence layer that survives process
//! restarts:
//! - a synchronous [`DurableStorage`] trait
//! - [`FileStorage`], a JSON-file backed implementation
//! - [`MemoryStorage`], an in-process implementation for tests
//! - [`SessionVault`], the high-level API that keeps the persisted
//!   token and user record paired

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::DurableStorage;
pub use vault::{SessionVault, UserRecord};

use std::path::PathBuf;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// No usable storage location on this system
    #[error("No data directory available")]
    NoDataDir,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Default on-disk location for session data (`<data dir>/quill/session.json`).
pub fn default_storage_path() -> StorageResult<PathBuf> {
    let base = dirs::data_dir().ok_or(StorageError::NoDataDir)?;
    Ok(base.join("quill").join("session.json"))
}

/// Create the default file-backed storage implementation.
pub fn create_storage() -> StorageResult<FileStorage> {
    FileStorage::open(default_storage_path()?)
}
