//! Main settlement engine
//!
//! Loads the poll into a [`SettlementDraft`] and writes the edited settlement
//! back in one transaction.

use ledger_core::{Denied, Identity, Ledger, Poll, PollId, Scope, Settlement, ShareRecord};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::{config::Config, draft::SettlementDraft, Error, Result};

/// Settlement engine
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    /// Ledger core
    ledger: Ledger,

    /// Rounding unit for per-person amounts
    unit: Decimal,
}

impl SettlementEngine {
    /// Create new settlement engine
    pub fn new(ledger: Ledger, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ledger,
            unit: config.split.rounding_unit,
        })
    }

    /// Open the poll's settlement for editing
    #[instrument(skip(self), fields(poll_id = %poll_id))]
    pub fn open_draft(&self, actor: &Identity, poll_id: &PollId) -> Result<SettlementDraft> {
        ensure_admin(actor)?;
        let poll = self.ledger.load::<Poll>(poll_id)?;
        Ok(SettlementDraft::from_poll(&poll, self.unit))
    }

    /// Store a settlement wholesale
    ///
    /// Attendees missing from `settlement` get zero records so every
    /// confirmed attendee stays covered.
    #[instrument(skip(self, settlement), fields(poll_id = %poll_id, items = settlement.items.len()))]
    pub async fn save_settlement(
        &self,
        actor: &Identity,
        poll_id: &PollId,
        settlement: Settlement,
    ) -> Result<()> {
        ensure_admin(actor)?;

        self.ledger
            .transact("save_settlement", |tx| {
                let mut poll = tx.require::<Poll>(poll_id)?;
                let mut stored = settlement.clone();
                for member_id in &poll.confirmed_attendees {
                    stored
                        .items
                        .entry(member_id.clone())
                        .or_insert_with(ShareRecord::zero);
                }
                poll.settlement = Some(stored);
                tx.put(&poll)?;
                Ok::<_, Error>(())
            })
            .await?;

        info!(
            total_base = %settlement.total_base,
            total_second_round = %settlement.total_second_round,
            total_transport = %settlement.total_transport,
            "Settlement saved"
        );
        Ok(())
    }

    /// Save a draft
    pub async fn save_draft(&self, actor: &Identity, draft: SettlementDraft) -> Result<()> {
        let poll_id = draft.poll_id().clone();
        self.save_settlement(actor, &poll_id, draft.into_settlement())
            .await
    }
}

fn ensure_admin(actor: &Identity) -> Result<()> {
    actor.authorize(Scope::Admin).map_err(|denied| match denied {
        Denied::Banned => Error::Banned(actor.member_id.clone()),
        _ => Error::PermissionDenied(format!("{} may not edit settlements", actor.member_id)),
    })
}
