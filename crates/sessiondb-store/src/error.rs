//! Errors raised by the storage adapter and the session store.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::codec::CodecError;

/// Errors that can occur during session storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The connection could not be opened or configured. Fatal at startup.
    #[error("Cannot open database at {path}: {source}")]
    Connection {
        path: String,
        source: rusqlite::Error,
    },

    /// The directory holding the database file could not be created.
    #[error("Cannot create database directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    /// A single statement failed.
    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] CodecError),

    /// Construction options were rejected.
    #[error("Invalid store options: {0}")]
    InvalidOptions(String),

    /// The blocking worker running a statement panicked or was cancelled.
    #[error("Storage worker failed: {0}")]
    Worker(String),
}

impl StoreError {
    /// Whether the statement gave up waiting on a conflicting writer.
    pub fn is_busy(&self) -> bool {
        match self {
            StoreError::Storage(rusqlite::Error::SqliteFailure(e, _)) => {
                matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            }
            _ => false,
        }
    }

    /// Whether this is the startup failure that should stop the process.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection { .. } | StoreError::CreateDir { .. })
    }

    /// Whether the stored data, rather than the store, is at fault.
    pub fn is_corrupt_data(&self) -> bool {
        matches!(self, StoreError::Serialization(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
