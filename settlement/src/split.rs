//! Proportional split arithmetic
//!
//! All amounts are exact decimals. Per-person amounts are rounded up to the
//! configured unit, so the shares of a round cover its total and may exceed
//! it by less than one unit per person.

use rust_decimal::Decimal;

use crate::types::RoundTotals;

/// Round up to a multiple of `unit`; non-positive amounts become zero
pub fn round_up(amount: Decimal, unit: Decimal) -> Decimal {
    if amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (amount / unit).ceil() * unit
}

/// Even share of `amount` across `heads`, rounded up; zero when nobody shares
pub fn per_head(amount: Decimal, heads: usize, unit: Decimal) -> Decimal {
    if heads == 0 {
        return Decimal::ZERO;
    }
    round_up(amount / Decimal::from(heads), unit)
}

/// Per-person amounts of one round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSplit {
    /// Everyone pays this
    pub food: Decimal,
    /// Drinkers additionally pay this
    pub beverage: Decimal,
}

impl RoundSplit {
    /// Share of an attendee
    pub fn share(&self, is_non_drinker: bool) -> Decimal {
        if is_non_drinker {
            self.food
        } else {
            self.food + self.beverage
        }
    }
}

/// Split a round across `attendees`, of whom `drinkers` drink
///
/// With no drinkers the beverage amount joins the food remainder.
pub fn split_round(totals: &RoundTotals, attendees: usize, drinkers: usize, unit: Decimal) -> RoundSplit {
    if drinkers == 0 {
        return RoundSplit {
            food: per_head(totals.food() + totals.beverage, attendees, unit),
            beverage: Decimal::ZERO,
        };
    }

    RoundSplit {
        food: per_head(totals.food(), attendees, unit),
        beverage: per_head(totals.beverage, drinkers, unit),
    }
}
