//! Core types for settlement engine

use ledger_core::{Settlement, ShareRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bill round; each has its own total, beverage part and auto flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Round {
    /// First venue
    Base,
    /// Second venue
    SecondRound,
}

impl Round {
    /// Both rounds, in bill order
    pub const ALL: [Round; 2] = [Round::Base, Round::SecondRound];

    /// The member's share for this round
    pub fn share(self, record: &ShareRecord) -> Decimal {
        match self {
            Round::Base => record.base_share,
            Round::SecondRound => record.second_round_share,
        }
    }

    /// Overwrite the member's share for this round
    pub fn set_share(self, record: &mut ShareRecord, amount: Decimal) {
        match self {
            Round::Base => record.base_share = amount,
            Round::SecondRound => record.second_round_share = amount,
        }
    }

    /// Whether the share is still subject to rebalancing
    pub fn is_auto(self, record: &ShareRecord) -> bool {
        match self {
            Round::Base => record.base_auto,
            Round::SecondRound => record.second_round_auto,
        }
    }

    /// Pin or release the share
    pub fn set_auto(self, record: &mut ShareRecord, auto: bool) {
        match self {
            Round::Base => record.base_auto = auto,
            Round::SecondRound => record.second_round_auto = auto,
        }
    }

    /// Published total of the round
    pub fn total(self, settlement: &Settlement) -> Decimal {
        match self {
            Round::Base => settlement.total_base,
            Round::SecondRound => settlement.total_second_round,
        }
    }
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Round::Base => write!(f, "base"),
            Round::SecondRound => write!(f, "second_round"),
        }
    }
}

/// Editable amount of a share record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareField {
    /// A round share; editing it pins the member and rebalances the round
    Round(Round),
    /// Transport share; edited without rebalancing
    Transport,
}

/// Amount of one round and its beverage part
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTotals {
    /// Whole bill of the round
    pub total: Decimal,
    /// Part of the bill that only drinkers pay
    pub beverage: Decimal,
}

impl RoundTotals {
    /// Round totals
    pub fn new(total: impl Into<Decimal>, beverage: impl Into<Decimal>) -> Self {
        Self {
            total: total.into(),
            beverage: beverage.into(),
        }
    }

    /// Remainder shared by everyone, floored at zero
    pub fn food(&self) -> Decimal {
        (self.total - self.beverage).max(Decimal::ZERO)
    }
}

/// Inputs of a bulk split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSplit {
    /// First round
    pub base: RoundTotals,
    /// Second round
    pub second_round: RoundTotals,
    /// Shared transport, split across attending requesters
    pub transport: Decimal,
}

impl BulkSplit {
    /// Totals of one round
    pub fn round(&self, round: Round) -> RoundTotals {
        match round {
            Round::Base => self.base,
            Round::SecondRound => self.second_round,
        }
    }
}

/// Published total against what the shares add up to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Published total
    pub total: Decimal,
    /// Sum of the members' shares
    pub assigned: Decimal,
}

impl RoundSummary {
    /// Assigned minus published; positive when rounding collected extra
    pub fn surplus(&self) -> Decimal {
        self.assigned - self.total
    }
}

/// Overview of a settlement draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    /// First round
    pub base: RoundSummary,
    /// Second round
    pub second_round: RoundSummary,
    /// Transport
    pub transport: RoundSummary,
    /// Members marked paid
    pub paid: usize,
    /// Members not yet paid
    pub unpaid: usize,
    /// Sum owed by unpaid members
    pub outstanding: Decimal,
}
