//! Gathering Ledger Core
//!
//! Document store with optimistic compare-and-swap transactions, holding the
//! member and poll documents shared by the participation and settlement
//! engines.
//!
//! # Architecture
//!
//! - **Versioned documents**: every write bumps a per-document version
//! - **Optimistic transactions**: read, compute, conditional write, retry
//! - **Single writer per store**: expectation checks and writes are atomic
//! - **Pluggable backends**: RocksDB for persistence, in-memory for tests
//!
//! # Invariants
//!
//! - A commit applies all of its writes or none
//! - A commit applies only if no document it read has changed since
//! - A failed transaction leaves every document untouched

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod document;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod poll;
pub mod storage;
pub mod transaction;
pub mod types;

// Re-exports
pub use config::{Config, TransactionConfig};
pub use document::{Document, DocumentKey};
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use poll::{
    Choice, ChoiceCollection, Participation, ParticipationRecord, ParticipationStatus, Poll,
    Settlement, ShareRecord,
};
pub use storage::{DocumentStore, MemoryStore, RocksStore};
pub use transaction::Transaction;
pub use types::{ChoiceId, Denied, Identity, Member, MemberId, PollId, Role, Scope};
