//! Poll documents: choices, participation records and the settlement sub-object
//!
//! A poll is one instance of the recurring gathering. Everything members
//! contend on during a voting window (vote sets, the participants map) lives
//! in this single document so one compare-and-swap covers it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::document::Document;
use crate::types::{ChoiceId, MemberId, PollId};

/// Which option collection a choice belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceCollection {
    /// Candidate dates
    Dates,
    /// Candidate venues
    Venues,
}

impl ChoiceCollection {
    /// The other collection
    pub fn other(self) -> Self {
        match self {
            ChoiceCollection::Dates => ChoiceCollection::Venues,
            ChoiceCollection::Venues => ChoiceCollection::Dates,
        }
    }
}

impl std::fmt::Display for ChoiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChoiceCollection::Dates => write!(f, "dates"),
            ChoiceCollection::Venues => write!(f, "venues"),
        }
    }
}

/// A selectable date or venue option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Choice ID
    pub id: ChoiceId,

    /// Label shown to members
    pub label: String,

    /// Street address (venues)
    pub address: Option<String>,

    /// Free-form notes
    pub notes: Option<String>,

    /// Members who voted for this choice
    pub votes: BTreeSet<MemberId>,

    /// Who proposed it
    pub created_by: MemberId,
}

impl Choice {
    /// New choice without votes
    pub fn new(label: impl Into<String>, created_by: MemberId) -> Self {
        Self {
            id: ChoiceId::generate(),
            label: label.into(),
            address: None,
            notes: None,
            votes: BTreeSet::new(),
            created_by,
        }
    }

    /// Number of votes
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Flip the member's vote. Returns true if the vote is now present.
    pub fn toggle_vote(&mut self, member_id: &MemberId) -> bool {
        if self.votes.remove(member_id) {
            false
        } else {
            self.votes.insert(member_id.clone());
            true
        }
    }
}

/// Explicit response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipationStatus {
    /// Committed to attend
    Joined,
    /// Declined (possibly after joining)
    Declined,
}

/// Stored response of one member to one poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    /// Current status
    pub status: ParticipationStatus,

    /// Reason given when declining
    pub decline_reason: Option<String>,

    /// Skips the beverage part of the bill
    pub is_non_drinker: bool,

    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// Participation state including the implicit "no response yet"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participation {
    /// Member has not responded
    NoResponse,
    /// Member joined
    Joined,
    /// Member declined
    Declined,
}

impl From<ParticipationStatus> for Participation {
    fn from(status: ParticipationStatus) -> Self {
        match status {
            ParticipationStatus::Joined => Participation::Joined,
            ParticipationStatus::Declined => Participation::Declined,
        }
    }
}

/// Per-member monetary shares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRecord {
    /// First round share
    pub base_share: Decimal,

    /// Second round share
    pub second_round_share: Decimal,

    /// Shared transport share
    pub transport_share: Decimal,

    /// Admin-asserted payment status
    pub is_paid: bool,

    /// First round share follows rebalancing (false = pinned by admin)
    pub base_auto: bool,

    /// Second round share follows rebalancing (false = pinned by admin)
    pub second_round_auto: bool,
}

impl ShareRecord {
    /// Zero amounts, auto for both rounds
    pub fn zero() -> Self {
        Self {
            base_share: Decimal::ZERO,
            second_round_share: Decimal::ZERO,
            transport_share: Decimal::ZERO,
            is_paid: false,
            base_auto: true,
            second_round_auto: true,
        }
    }

    /// Everything this member owes
    pub fn total(&self) -> Decimal {
        self.base_share + self.second_round_share + self.transport_share
    }
}

impl Default for ShareRecord {
    fn default() -> Self {
        Self::zero()
    }
}

/// Bill breakdown for a finished poll
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Receipt image reference
    pub image_ref: Option<String>,

    /// Shares per attendee
    pub items: BTreeMap<MemberId, ShareRecord>,

    /// First round total
    pub total_base: Decimal,

    /// Beverage part of the first round
    pub total_base_beverage: Decimal,

    /// Second round total
    pub total_second_round: Decimal,

    /// Beverage part of the second round
    pub total_second_round_beverage: Decimal,

    /// Shared transport total
    pub total_transport: Decimal,
}

/// Poll document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    /// Poll ID
    pub id: PollId,

    /// Title
    pub title: String,

    /// Description
    pub description: String,

    /// Candidate dates
    pub date_choices: Vec<Choice>,

    /// Candidate venues
    pub venue_choices: Vec<Choice>,

    /// Responses by member
    pub participants: BTreeMap<MemberId, ParticipationRecord>,

    /// Members checked in by an admin
    pub confirmed_attendees: BTreeSet<MemberId>,

    /// Admin-chosen date
    pub finalized_date_id: Option<ChoiceId>,

    /// Admin-chosen venue
    pub finalized_venue_id: Option<ChoiceId>,

    /// Voting deadline (None = unlimited)
    pub deadline: Option<DateTime<Utc>>,

    /// Hidden from member lists
    pub is_hidden: bool,

    /// Members asking for shared transport
    pub taxi_requesters: BTreeSet<MemberId>,

    /// Bill breakdown, once entered
    pub settlement: Option<Settlement>,

    /// Creating admin
    pub created_by: MemberId,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Poll {
    /// Choices of one collection
    pub fn choices(&self, collection: ChoiceCollection) -> &[Choice] {
        match collection {
            ChoiceCollection::Dates => &self.date_choices,
            ChoiceCollection::Venues => &self.venue_choices,
        }
    }

    /// Mutable choices of one collection
    pub fn choices_mut(&mut self, collection: ChoiceCollection) -> &mut Vec<Choice> {
        match collection {
            ChoiceCollection::Dates => &mut self.date_choices,
            ChoiceCollection::Venues => &mut self.venue_choices,
        }
    }

    /// Find a choice by ID
    pub fn choice(&self, collection: ChoiceCollection, choice_id: &ChoiceId) -> Option<&Choice> {
        self.choices(collection).iter().find(|c| &c.id == choice_id)
    }

    /// Find a choice by ID (mutable)
    pub fn choice_mut(
        &mut self,
        collection: ChoiceCollection,
        choice_id: &ChoiceId,
    ) -> Option<&mut Choice> {
        self.choices_mut(collection)
            .iter_mut()
            .find(|c| &c.id == choice_id)
    }

    /// Participation state of a member
    pub fn participation(&self, member_id: &MemberId) -> Participation {
        self.participants
            .get(member_id)
            .map(|record| record.status.into())
            .unwrap_or(Participation::NoResponse)
    }

    /// Whether the member voted for any choice of the collection
    pub fn has_vote_in(&self, collection: ChoiceCollection, member_id: &MemberId) -> bool {
        self.choices(collection)
            .iter()
            .any(|c| c.votes.contains(member_id))
    }

    /// Remove the member from every vote set. Returns how many votes were removed.
    pub fn retract_votes(&mut self, member_id: &MemberId) -> usize {
        self.date_choices
            .iter_mut()
            .chain(self.venue_choices.iter_mut())
            .map(|c| c.votes.remove(member_id))
            .filter(|&removed| removed)
            .count()
    }

    /// Whether the deadline has passed at `now`
    pub fn is_deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map_or(false, |deadline| now >= deadline)
    }

    /// Non-drinker flag of a member (false when there is no record)
    pub fn is_non_drinker(&self, member_id: &MemberId) -> bool {
        self.participants
            .get(member_id)
            .map_or(false, |record| record.is_non_drinker)
    }
}

impl Document for Poll {
    const COLLECTION: &'static str = "polls";
    type Id = PollId;

    fn id(&self) -> &PollId {
        &self.id
    }
}
