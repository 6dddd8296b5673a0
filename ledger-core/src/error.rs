//! Error types for the ledger store

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Referenced document does not exist (or was deleted)
    #[error("{collection} not found: {id}")]
    NotFound {
        /// Collection name
        collection: &'static str,
        /// Document id
        id: String,
    },

    /// A document read by the transaction changed before commit
    #[error("Write conflict on {0}")]
    Conflict(String),

    /// Conflicts kept recurring until the retry budget ran out
    #[error("Transaction gave up after {attempts} attempts")]
    RetriesExhausted {
        /// Attempts made (initial try included)
        attempts: u32,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a not-found error for a collection/id pair
    pub fn not_found(collection: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            collection,
            id: id.to_string(),
        }
    }

    /// Whether re-running the transaction from a fresh read may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
