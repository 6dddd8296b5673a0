//! Auto-rebalance after a manual edit
//!
//! Pinned shares are never touched. What is left of the round total after the
//! pinned shares and the auto non-drinkers' shares goes evenly to the auto
//! drinkers. Without auto drinkers, what is left after the pinned shares goes
//! to the auto non-drinkers instead.

use std::collections::{BTreeMap, BTreeSet};

use ledger_core::{MemberId, ShareRecord};
use rust_decimal::Decimal;

use crate::{split::per_head, types::Round};

/// Who received the redistributed remainder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebalanced {
    /// Auto drinkers, each at this amount
    Drinkers(Decimal),
    /// No auto drinkers; auto non-drinkers, each at this amount
    NonDrinkers(Decimal),
    /// Every share is pinned
    Nothing,
}

/// Redistribute `total` over the auto shares of `round`
pub fn rebalance(
    items: &mut BTreeMap<MemberId, ShareRecord>,
    round: Round,
    total: Decimal,
    non_drinkers: &BTreeSet<MemberId>,
    unit: Decimal,
) -> Rebalanced {
    let mut pinned = Decimal::ZERO;
    let mut abstained = Decimal::ZERO;
    let mut drinkers = Vec::new();
    let mut abstainers = Vec::new();

    for (member_id, record) in items.iter() {
        if !round.is_auto(record) {
            pinned += round.share(record);
        } else if non_drinkers.contains(member_id) {
            abstained += round.share(record);
            abstainers.push(member_id.clone());
        } else {
            drinkers.push(member_id.clone());
        }
    }

    let (targets, each, outcome): (_, _, fn(Decimal) -> Rebalanced) = if !drinkers.is_empty() {
        let each = per_head(total - pinned - abstained, drinkers.len(), unit);
        (drinkers, each, Rebalanced::Drinkers)
    } else if !abstainers.is_empty() {
        let each = per_head(total - pinned, abstainers.len(), unit);
        (abstainers, each, Rebalanced::NonDrinkers)
    } else {
        return Rebalanced::Nothing;
    };

    for member_id in &targets {
        if let Some(record) = items.get_mut(member_id) {
            round.set_share(record, each);
        }
    }

    outcome(each)
}
