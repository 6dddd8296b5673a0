//! Participation Engine
//!
//! Join/decline state machine, vote toggling, deadline enforcement and the
//! no-show penalty bookkeeping for polls stored in the ledger.
//!
//! # State machine
//!
//! ```text
//! NoResponse ──join──▶ Joined ◀──join── Declined
//!                        │                 ▲
//!                        └─────decline─────┘   (retracts all votes)
//! ```
//!
//! # Penalties
//!
//! A decline that follows a join counts one flake per poll. Voting in both the
//! date and venue collections before the deadline redeems it; an admin
//! check-in forgives it.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Identity, Ledger, ParticipationStatus, PollId, TransactionConfig};
//! use participation::{Config, ParticipationEngine};
//!
//! #[tokio::main]
//! async fn main() -> participation::Result<()> {
//!     let ledger = Ledger::in_memory(TransactionConfig::default())?;
//!     let engine = ParticipationEngine::new(ledger, &Config::default())?;
//!
//!     let me = Identity::member("m1");
//!     engine.register_member(&me, "Minji").await?;
//!     engine
//!         .submit_participation(&me, &PollId::new("p1"), &me.member_id, ParticipationStatus::Joined, None)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod access;
pub mod config;
pub mod engine;
pub mod error;
pub mod finalization;
pub mod stats;
pub mod transitions;
pub mod types;

pub use config::{Config, PollRules};
pub use engine::ParticipationEngine;
pub use error::{Error, Result};
pub use finalization::{is_ended, resolve, tally, FinalizationResolver, Resolution};
pub use stats::{MemberStats, MemberStatsUpdate};
pub use transitions::{AttendanceOutcome, FlakeOutcome, ParticipationOutcome, VoteOutcome};
pub use types::{Finalize, NewChoice, NewPoll};
