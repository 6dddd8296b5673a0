//! Request types accepted by the participation engine

use chrono::{DateTime, Utc};
use ledger_core::{Choice, ChoiceId, MemberId};
use serde::{Deserialize, Serialize};

use crate::{config::PollRules, Error, Result};

/// A proposed date or venue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewChoice {
    /// Label shown to members
    pub label: String,
    /// Street address (venues)
    pub address: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
}

impl NewChoice {
    /// Choice with only a label
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Trim and check the label
    pub fn validate(&self, rules: &PollRules) -> Result<()> {
        let label = self.label.trim();
        if label.is_empty() {
            return Err(Error::InvalidChoice("label is empty".to_string()));
        }
        if label.chars().count() > rules.max_label_len {
            return Err(Error::InvalidChoice(format!(
                "label longer than {} characters",
                rules.max_label_len
            )));
        }
        Ok(())
    }

    /// Materialize with a fresh id
    pub fn into_choice(self, created_by: MemberId) -> Choice {
        Choice {
            id: ChoiceId::generate(),
            label: self.label.trim().to_string(),
            address: self.address,
            notes: self.notes,
            votes: Default::default(),
            created_by,
        }
    }
}

/// Poll creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPoll {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Candidate dates
    pub dates: Vec<NewChoice>,
    /// Candidate venues
    pub venues: Vec<NewChoice>,
    /// Voting deadline, None for unlimited
    pub deadline: Option<DateTime<Utc>>,
}

impl NewPoll {
    /// Check the poll against the creation rules
    pub fn validate(&self, rules: &PollRules) -> Result<()> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidPoll("title is empty".to_string()));
        }
        if title.chars().count() > rules.max_label_len {
            return Err(Error::InvalidPoll(format!(
                "title longer than {} characters",
                rules.max_label_len
            )));
        }
        if self.dates.len() < rules.min_date_choices {
            return Err(Error::InvalidPoll(format!(
                "needs at least {} date choice(s), got {}",
                rules.min_date_choices,
                self.dates.len()
            )));
        }
        if self.venues.len() < rules.min_venue_choices {
            return Err(Error::InvalidPoll(format!(
                "needs at least {} venue choices, got {}",
                rules.min_venue_choices,
                self.venues.len()
            )));
        }

        self.dates
            .iter()
            .chain(&self.venues)
            .try_for_each(|choice| choice.validate(rules))
    }
}

/// Finalize request; `None` fields clear the override or keep the attendees
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Finalize {
    /// Finalized date, None falls back to the tally
    pub date: Option<ChoiceId>,
    /// Finalized venue, None falls back to the tally
    pub venue: Option<ChoiceId>,
    /// Replacement attendee set
    pub attendees: Option<Vec<MemberId>>,
}
