//! Finalization resolver
//!
//! Computes the winning date and venue from the vote tallies and applies admin
//! overrides. Ties are reported jointly; picking one of them is left to the
//! admin's explicit finalize.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use ledger_core::{Choice, ChoiceCollection, ChoiceId, Identity, Ledger, Member, MemberId, Poll, PollId};
use tracing::{info, instrument};

use crate::{access, types::Finalize, Error, Result};

/// Every choice holding the maximum vote count; empty when nobody voted
pub fn tally(choices: &[Choice]) -> Vec<&Choice> {
    let max = choices.iter().map(Choice::vote_count).max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    choices.iter().filter(|c| c.vote_count() == max).collect()
}

/// Effective outcome of a collection at display time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Admin-finalized choice
    Finalized(ChoiceId),
    /// Tally winners, possibly tied
    Leading(Vec<ChoiceId>),
    /// No votes and no override
    Undecided,
}

/// Finalized id if set, otherwise the tally
pub fn resolve(poll: &Poll, collection: ChoiceCollection) -> Resolution {
    let finalized = match collection {
        ChoiceCollection::Dates => &poll.finalized_date_id,
        ChoiceCollection::Venues => &poll.finalized_venue_id,
    };
    if let Some(id) = finalized {
        return Resolution::Finalized(id.clone());
    }

    let winners: Vec<ChoiceId> = tally(poll.choices(collection))
        .into_iter()
        .map(|c| c.id.clone())
        .collect();
    if winners.is_empty() {
        Resolution::Undecided
    } else {
        Resolution::Leading(winners)
    }
}

/// Deadline passed or venue finalized; either is enough
pub fn is_ended(poll: &Poll, now: DateTime<Utc>) -> bool {
    poll.is_deadline_passed(now) || poll.finalized_venue_id.is_some()
}

fn check_choice(poll: &Poll, collection: ChoiceCollection, id: Option<&ChoiceId>) -> Result<()> {
    match id {
        Some(choice_id) if poll.choice(collection, choice_id).is_none() => Err(Error::ChoiceNotFound {
            collection,
            choice_id: choice_id.clone(),
        }),
        _ => Ok(()),
    }
}

/// Admin finalize and reopen
#[derive(Debug, Clone)]
pub struct FinalizationResolver {
    ledger: Ledger,
}

impl FinalizationResolver {
    /// Resolver over a ledger
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Set or clear the finalized ids, optionally replacing the attendees
    ///
    /// Members newly added to the attendees have their flake for this poll
    /// forgiven, as with a check-in. Returns the members forgiven.
    #[instrument(skip(self, request), fields(poll_id = %poll_id))]
    pub async fn finalize(
        &self,
        actor: &Identity,
        poll_id: &PollId,
        request: Finalize,
    ) -> Result<Vec<MemberId>> {
        access::ensure_admin(actor, "finalize")?;

        let forgiven = self
            .ledger
            .transact("finalize", |tx| {
                let mut poll = tx.require::<Poll>(poll_id)?;
                check_choice(&poll, ChoiceCollection::Dates, request.date.as_ref())?;
                check_choice(&poll, ChoiceCollection::Venues, request.venue.as_ref())?;

                poll.finalized_date_id = request.date.clone();
                poll.finalized_venue_id = request.venue.clone();

                let mut forgiven = Vec::new();
                if let Some(attendees) = &request.attendees {
                    let attendees: BTreeSet<MemberId> = attendees.iter().cloned().collect();
                    for member_id in attendees.difference(&poll.confirmed_attendees) {
                        if let Some(mut member) = tx.get::<Member>(member_id)? {
                            if member.forgive_flake(&poll.id) {
                                tx.put(&member)?;
                                forgiven.push(member_id.clone());
                            }
                        }
                    }
                    poll.confirmed_attendees = attendees;
                }

                tx.put(&poll)?;
                Ok::<_, Error>(forgiven)
            })
            .await?;

        info!(
            date = ?request.date,
            venue = ?request.venue,
            forgiven = forgiven.len(),
            "Poll finalized"
        );
        Ok(forgiven)
    }

    /// Clear both finalized ids; the deadline is untouched
    #[instrument(skip(self), fields(poll_id = %poll_id))]
    pub async fn reopen(&self, actor: &Identity, poll_id: &PollId) -> Result<()> {
        access::ensure_admin(actor, "reopen")?;

        self.ledger
            .transact("reopen", |tx| {
                let mut poll = tx.require::<Poll>(poll_id)?;
                if poll.finalized_date_id.is_none() && poll.finalized_venue_id.is_none() {
                    return Ok::<_, Error>(());
                }
                poll.finalized_date_id = None;
                poll.finalized_venue_id = None;
                tx.put(&poll)?;
                Ok(())
            })
            .await?;

        info!("Poll reopened");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn choices(votes: &[usize]) -> Vec<Choice> {
        votes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let mut choice = Choice::new(format!("C{}", i), MemberId::new("admin"));
                for voter in 0..n {
                    choice.votes.insert(MemberId::new(format!("m{}", voter)));
                }
                choice
            })
            .collect()
    }

    fn poll() -> Poll {
        Poll {
            id: PollId::new("p1"),
            title: "Dinner".to_string(),
            description: String::new(),
            date_choices: choices(&[1, 0]),
            venue_choices: choices(&[2, 2, 1]),
            participants: Default::default(),
            confirmed_attendees: Default::default(),
            finalized_date_id: None,
            finalized_venue_id: None,
            deadline: None,
            is_hidden: false,
            taxi_requesters: Default::default(),
            settlement: None,
            created_by: MemberId::new("admin"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tally_ties_and_empty() {
        let tied = choices(&[3, 1, 3]);
        let winners: Vec<_> = tally(&tied).into_iter().map(|c| c.label.as_str()).collect();
        assert_eq!(winners, vec!["C0", "C2"]);

        assert!(tally(&choices(&[0, 0])).is_empty());
        assert!(tally(&[]).is_empty());
    }

    #[test]
    fn test_resolution_prefers_finalized() {
        let mut poll = poll();
        match resolve(&poll, ChoiceCollection::Venues) {
            Resolution::Leading(ids) => assert_eq!(ids.len(), 2),
            other => panic!("unexpected {:?}", other),
        }

        let pick = poll.venue_choices[2].id.clone();
        poll.finalized_venue_id = Some(pick.clone());
        assert_eq!(resolve(&poll, ChoiceCollection::Venues), Resolution::Finalized(pick));

        poll.date_choices[0].votes.clear();
        assert_eq!(resolve(&poll, ChoiceCollection::Dates), Resolution::Undecided);
    }

    #[test]
    fn test_ended_on_either_condition() {
        let now = Utc::now();
        let mut poll = poll();
        assert!(!is_ended(&poll, now));

        poll.finalized_venue_id = Some(poll.venue_choices[0].id.clone());
        assert!(is_ended(&poll, now));

        poll.finalized_venue_id = None;
        poll.deadline = Some(now - Duration::seconds(1));
        assert!(is_ended(&poll, now));
    }

    #[test]
    fn test_finalized_date_alone_does_not_end() {
        let mut poll = poll();
        poll.finalized_date_id = Some(poll.date_choices[0].id.clone());
        assert!(!is_ended(&poll, Utc::now()));
    }
}
