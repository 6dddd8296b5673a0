//! In-memory settlement editor
//!
//! An admin opens a draft from the stored poll, applies a bulk split, adjusts
//! individual shares and toggles payments, then saves the draft wholesale.
//! Nothing here touches the ledger.

use std::collections::BTreeSet;

use ledger_core::{MemberId, Poll, PollId, Settlement, ShareRecord};
use rust_decimal::Decimal;
use tracing::debug;

use crate::{
    rebalance::{rebalance, Rebalanced},
    split::{per_head, split_round},
    types::{BulkSplit, Round, RoundSummary, SettlementSummary, ShareField},
    Error, Result,
};

/// Editable settlement of one poll
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementDraft {
    poll_id: PollId,
    attendees: BTreeSet<MemberId>,
    non_drinkers: BTreeSet<MemberId>,
    riders: BTreeSet<MemberId>,
    settlement: Settlement,
    unit: Decimal,
}

impl SettlementDraft {
    /// Draft from the poll's stored settlement
    ///
    /// Every confirmed attendee without a share record gets a zero one.
    /// Records of members who are no longer attendees are dropped.
    pub fn from_poll(poll: &Poll, unit: Decimal) -> Self {
        let attendees = poll.confirmed_attendees.clone();
        let non_drinkers = attendees
            .iter()
            .filter(|id| poll.is_non_drinker(id))
            .cloned()
            .collect();
        let riders = attendees
            .intersection(&poll.taxi_requesters)
            .cloned()
            .collect();

        let mut settlement = poll.settlement.clone().unwrap_or_default();
        settlement.items.retain(|id, _| attendees.contains(id));
        for member_id in &attendees {
            settlement
                .items
                .entry(member_id.clone())
                .or_insert_with(ShareRecord::zero);
        }

        Self {
            poll_id: poll.id.clone(),
            attendees,
            non_drinkers,
            riders,
            settlement,
            unit,
        }
    }

    /// Poll the draft belongs to
    pub fn poll_id(&self) -> &PollId {
        &self.poll_id
    }

    /// Current settlement
    pub fn settlement(&self) -> &Settlement {
        &self.settlement
    }

    /// Hand over the settlement for saving
    pub fn into_settlement(self) -> Settlement {
        self.settlement
    }

    /// Share record of a member
    pub fn share(&self, member_id: &MemberId) -> Option<&ShareRecord> {
        self.settlement.items.get(member_id)
    }

    /// Attach the receipt image
    pub fn set_image_ref(&mut self, image_ref: Option<String>) {
        self.settlement.image_ref = image_ref;
    }

    /// Recompute every attendee's shares from the round totals
    ///
    /// All shares become auto again. Records of members who are no longer
    /// attendees are dropped; payment flags of the others are kept.
    pub fn apply_bulk_split(&mut self, split: BulkSplit) -> Result<()> {
        if self.attendees.is_empty() {
            return Err(Error::NoAttendees(self.poll_id.clone()));
        }
        for amount in [
            split.base.total,
            split.base.beverage,
            split.second_round.total,
            split.second_round.beverage,
            split.transport,
        ] {
            ensure_non_negative(amount)?;
        }

        let attendees = self.attendees.len();
        let drinkers = attendees - self.non_drinkers.len();
        let base = split_round(&split.base, attendees, drinkers, self.unit);
        let second = split_round(&split.second_round, attendees, drinkers, self.unit);
        let transport = per_head(split.transport, self.riders.len(), self.unit);

        let current = &self.attendees;
        self.settlement.items.retain(|id, _| current.contains(id));
        for member_id in &self.attendees {
            let is_non_drinker = self.non_drinkers.contains(member_id);
            let record = self
                .settlement
                .items
                .entry(member_id.clone())
                .or_insert_with(ShareRecord::zero);

            record.base_share = base.share(is_non_drinker);
            record.second_round_share = second.share(is_non_drinker);
            record.transport_share = if self.riders.contains(member_id) {
                transport
            } else {
                Decimal::ZERO
            };
            record.base_auto = true;
            record.second_round_auto = true;
        }

        self.settlement.total_base = split.base.total;
        self.settlement.total_base_beverage = split.base.beverage;
        self.settlement.total_second_round = split.second_round.total;
        self.settlement.total_second_round_beverage = split.second_round.beverage;
        self.settlement.total_transport = split.transport;

        debug!(
            poll_id = %self.poll_id,
            attendees = self.attendees.len(),
            drinkers,
            riders = self.riders.len(),
            "Bulk split applied"
        );
        Ok(())
    }

    /// Set one amount by hand
    ///
    /// A round edit pins the member for that round and rebalances the others.
    /// Returns how the round was rebalanced (`Nothing` for transport).
    pub fn adjust_share(
        &mut self,
        member_id: &MemberId,
        field: ShareField,
        amount: Decimal,
    ) -> Result<Rebalanced> {
        ensure_non_negative(amount)?;
        let record = self
            .settlement
            .items
            .get_mut(member_id)
            .ok_or_else(|| Error::NoShareRecord(member_id.clone()))?;

        let round = match field {
            ShareField::Transport => {
                record.transport_share = amount;
                return Ok(Rebalanced::Nothing);
            }
            ShareField::Round(round) => round,
        };

        round.set_share(record, amount);
        round.set_auto(record, false);

        let total = round.total(&self.settlement);
        let outcome = rebalance(
            &mut self.settlement.items,
            round,
            total,
            &self.non_drinkers,
            self.unit,
        );

        debug!(poll_id = %self.poll_id, member_id = %member_id, %round, %amount, ?outcome, "Share pinned");
        Ok(outcome)
    }

    /// Flip a member's payment flag; returns the new value
    pub fn toggle_paid(&mut self, member_id: &MemberId) -> Result<bool> {
        let record = self
            .settlement
            .items
            .get_mut(member_id)
            .ok_or_else(|| Error::NoShareRecord(member_id.clone()))?;
        record.is_paid = !record.is_paid;
        Ok(record.is_paid)
    }

    /// Per-round sums against the published totals
    pub fn summary(&self) -> SettlementSummary {
        let items = &self.settlement.items;
        let sum_round = |round: Round| RoundSummary {
            total: round.total(&self.settlement),
            assigned: items.values().map(|r| round.share(r)).sum(),
        };

        let (paid, unpaid): (Vec<&ShareRecord>, Vec<&ShareRecord>) =
            items.values().partition(|r| r.is_paid);

        SettlementSummary {
            base: sum_round(Round::Base),
            second_round: sum_round(Round::SecondRound),
            transport: RoundSummary {
                total: self.settlement.total_transport,
                assigned: items.values().map(|r| r.transport_share).sum(),
            },
            paid: paid.len(),
            unpaid: unpaid.len(),
            outstanding: unpaid.iter().map(|r| r.total()).sum(),
        }
    }
}

fn ensure_non_negative(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount,
            reason: "amounts cannot be negative",
        });
    }
    Ok(())
}
