//! Settlement Engine
//!
//! Splits a finished gathering's bill across its confirmed attendees.
//!
//! # Architecture
//!
//! 1. **Draft**: load the poll; every attendee gets a share record
//! 2. **Bulk split**: per round, food evenly across attendees, beverage
//!    evenly across drinkers; transport across attending requesters
//! 3. **Adjust**: a manual edit pins that share and rebalances the auto ones
//! 4. **Save**: write the settlement back to the poll in one transaction
//!
//! # Rounding
//!
//! Per-person amounts are rounded up to the rounding unit (1,000 by
//! default), so the shares of a round cover its total.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Identity, Ledger, PollId, TransactionConfig};
//! use settlement::{BulkSplit, Config, RoundTotals, SettlementEngine};
//!
//! #[tokio::main]
//! async fn main() -> settlement::Result<()> {
//!     let ledger = Ledger::in_memory(TransactionConfig::default())?;
//!     let engine = SettlementEngine::new(ledger, &Config::default())?;
//!     let admin = Identity::admin("admin");
//!
//!     let mut draft = engine.open_draft(&admin, &PollId::new("p1"))?;
//!     draft.apply_bulk_split(BulkSplit {
//!         base: RoundTotals::new(90_000, 60_000),
//!         ..Default::default()
//!     })?;
//!     engine.save_draft(&admin, draft).await?;
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod draft;
pub mod engine;
pub mod error;
pub mod rebalance;
pub mod split;
pub mod types;

// Re-exports
pub use config::{Config, SplitConfig};
pub use draft::SettlementDraft;
pub use engine::SettlementEngine;
pub use error::{Error, Result};
pub use rebalance::Rebalanced;
pub use types::*;
