//! Error types for settlement engine

use ledger_core::{MemberId, PollId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),

    /// Bulk split on a poll nobody checked in to
    #[error("Poll {0} has no confirmed attendees")]
    NoAttendees(PollId),

    /// Editing a member who is not in the settlement
    #[error("Member {0} has no share record")]
    NoShareRecord(MemberId),

    /// Banned caller
    #[error("Member {0} is banned")]
    Banned(MemberId),

    /// Non-admin attempting to settle
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Negative or otherwise unusable amount
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount {
        /// Offending amount
        amount: Decimal,
        /// What is wrong with it
        reason: &'static str,
    },

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
