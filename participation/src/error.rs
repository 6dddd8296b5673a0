//! Error types for the participation engine

use chrono::{DateTime, Utc};
use ledger_core::{ChoiceCollection, ChoiceId, MemberId};
use thiserror::Error;

/// Result type for participation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Participation errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error (not found, conflict retries exhausted, storage)
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),

    /// Acting after the poll's deadline
    #[error("Deadline passed at {deadline}")]
    DeadlinePassed {
        /// The poll's deadline
        deadline: DateTime<Utc>,
    },

    /// Voting or proposing without having joined
    #[error("Member {0} has not joined this poll")]
    NotJoined(MemberId),

    /// Non-admin attempting an admin-only mutation, or acting for someone else
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Banned members cannot act
    #[error("Member {0} is banned")]
    Banned(MemberId),

    /// Choice does not exist in the collection
    #[error("Choice {choice_id} not found in {collection}")]
    ChoiceNotFound {
        /// Collection searched
        collection: ChoiceCollection,
        /// Missing choice
        choice_id: ChoiceId,
    },

    /// Poll definition rejected
    #[error("Invalid poll: {0}")]
    InvalidPoll(String),

    /// Choice definition rejected
    #[error("Invalid choice: {0}")]
    InvalidChoice(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error is a not-found from the store
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Ledger(ledger_core::Error::NotFound { .. }))
    }
}
