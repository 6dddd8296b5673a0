//! Participation engine
//!
//! Every operation is one optimistic transaction on the ledger. The closures
//! re-read the poll and member on each attempt and hand them to the pure
//! transitions in [`crate::transitions`], so a retried attempt decides from
//! fresh state and penalties are never counted twice.

use chrono::{DateTime, Utc};
use ledger_core::{
    Choice, ChoiceCollection, ChoiceId, Identity, Ledger, Member, MemberId, Participation,
    ParticipationStatus, Poll, PollId,
};
use tracing::{debug, info, instrument};

use crate::{
    access,
    config::{Config, PollRules},
    stats::{self, MemberStats, MemberStatsUpdate},
    transitions::{
        self, AttendanceOutcome, FlakeOutcome, ParticipationOutcome, VoteOutcome,
    },
    types::{NewChoice, NewPoll},
    Error, Result,
};

/// Participation engine
#[derive(Debug, Clone)]
pub struct ParticipationEngine {
    ledger: Ledger,
    rules: PollRules,
}

impl ParticipationEngine {
    /// Engine over a ledger
    pub fn new(ledger: Ledger, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ledger,
            rules: config.rules.clone(),
        })
    }

    /// Underlying ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Create the member document on first sign-in
    ///
    /// Re-registering returns the stored document untouched.
    #[instrument(skip(self), fields(member_id = %actor.member_id))]
    pub async fn register_member(&self, actor: &Identity, display_name: &str) -> Result<Member> {
        self.ledger
            .transact("register_member", |tx| {
                if let Some(existing) = tx.get::<Member>(&actor.member_id)? {
                    return Ok::<_, Error>(existing);
                }
                let mut member = Member::new(actor.member_id.clone(), display_name, actor.role);
                member.is_banned = actor.is_banned;
                tx.put(&member)?;
                Ok(member)
            })
            .await
    }

    /// Create a poll with its initial choices
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create_poll(&self, actor: &Identity, request: NewPoll) -> Result<Poll> {
        access::ensure_admin(actor, "create poll")?;
        request.validate(&self.rules)?;

        let author = &actor.member_id;
        let poll = Poll {
            id: PollId::generate(),
            title: request.title.trim().to_string(),
            description: request.description,
            date_choices: request
                .dates
                .into_iter()
                .map(|c| c.into_choice(author.clone()))
                .collect(),
            venue_choices: request
                .venues
                .into_iter()
                .map(|c| c.into_choice(author.clone()))
                .collect(),
            participants: Default::default(),
            confirmed_attendees: Default::default(),
            finalized_date_id: None,
            finalized_venue_id: None,
            deadline: request.deadline,
            is_hidden: false,
            taxi_requesters: Default::default(),
            settlement: None,
            created_by: author.clone(),
            created_at: Utc::now(),
        };

        self.ledger
            .transact("create_poll", |tx| {
                tx.put(&poll)?;
                Ok::<_, Error>(())
            })
            .await?;

        info!(poll_id = %poll.id, "Poll created");
        Ok(poll)
    }

    /// Join or decline
    #[instrument(skip(self, reason), fields(poll_id = %poll_id, member_id = %member_id))]
    pub async fn submit_participation(
        &self,
        actor: &Identity,
        poll_id: &PollId,
        member_id: &MemberId,
        status: ParticipationStatus,
        reason: Option<String>,
    ) -> Result<ParticipationOutcome> {
        access::ensure_self_or_admin(actor, member_id)?;

        let outcome = self
            .ledger
            .transact("submit_participation", |tx| {
                let mut poll = tx.require::<Poll>(poll_id)?;
                let mut member = tx.require::<Member>(member_id)?;
                if member.is_banned {
                    return Err(Error::Banned(member.id));
                }
                let now = Utc::now();
                transitions::ensure_open(&poll, now)?;

                let outcome =
                    transitions::apply_participation(&mut poll, &mut member, status, reason.clone(), now);

                tx.put(&poll)?;
                if outcome.flake_accrued {
                    tx.put(&member)?;
                }
                Ok(outcome)
            })
            .await?;

        if outcome.flake_accrued {
            info!(previous = ?outcome.previous, "Flake accrued");
        }
        debug!(status = ?outcome.current, retracted = outcome.votes_retracted, "Participation recorded");
        Ok(outcome)
    }

    /// Set the non-drinker flag on a member's own record
    #[instrument(skip(self), fields(poll_id = %poll_id, member_id = %member_id))]
    pub async fn set_non_drinker(
        &self,
        actor: &Identity,
        poll_id: &PollId,
        member_id: &MemberId,
        non_drinker: bool,
    ) -> Result<()> {
        access::ensure_self_or_admin(actor, member_id)?;

        self.ledger
            .transact("set_non_drinker", |tx| {
                let mut poll = tx.require::<Poll>(poll_id)?;
                let record = poll
                    .participants
                    .get_mut(member_id)
                    .ok_or_else(|| Error::NotJoined(member_id.clone()))?;
                if record.is_non_drinker == non_drinker {
                    return Ok(());
                }
                record.is_non_drinker = non_drinker;
                record.updated_at = Utc::now();
                tx.put(&poll)?;
                Ok(())
            })
            .await
    }

    /// Toggle a joined member's shared-transport request
    ///
    /// Returns whether the member is now a requester.
    #[instrument(skip(self), fields(poll_id = %poll_id, member_id = %member_id))]
    pub async fn toggle_taxi_request(
        &self,
        actor: &Identity,
        poll_id: &PollId,
        member_id: &MemberId,
    ) -> Result<bool> {
        access::ensure_self_or_admin(actor, member_id)?;

        self.ledger
            .transact("toggle_taxi_request", |tx| {
                let mut poll = tx.require::<Poll>(poll_id)?;
                if poll.participation(member_id) != Participation::Joined {
                    return Err(Error::NotJoined(member_id.clone()));
                }
                let requested = if poll.taxi_requesters.remove(member_id) {
                    false
                } else {
                    poll.taxi_requesters.insert(member_id.clone());
                    true
                };
                tx.put(&poll)?;
                Ok(requested)
            })
            .await
    }

    /// Toggle a vote; may redeem the member's flake for this poll
    #[instrument(skip(self), fields(poll_id = %poll_id, member_id = %member_id))]
    pub async fn vote(
        &self,
        actor: &Identity,
        poll_id: &PollId,
        member_id: &MemberId,
        collection: ChoiceCollection,
        choice_id: &ChoiceId,
    ) -> Result<VoteOutcome> {
        access::ensure_self_or_admin(actor, member_id)?;

        let outcome = self
            .ledger
            .transact("vote", |tx| {
                let mut poll = tx.require::<Poll>(poll_id)?;
                let mut member = tx.require::<Member>(member_id)?;

                let outcome = transitions::apply_vote(
                    &mut poll,
                    &mut member,
                    collection,
                    choice_id,
                    Utc::now(),
                )?;

                tx.put(&poll)?;
                if outcome.redeemed {
                    tx.put(&member)?;
                }
                Ok::<_, Error>(outcome)
            })
            .await?;

        if outcome.redeemed {
            info!("Flake redeemed by voting");
        }
        debug!(%collection, choice_id = %choice_id, voted = outcome.voted, "Vote toggled");
        Ok(outcome)
    }

    /// Propose a choice; the caller's vote is seeded on it
    ///
    /// Non-admins must have joined. Returns the stored choice.
    #[instrument(skip(self, proposal), fields(poll_id = %poll_id, member_id = %actor.member_id))]
    pub async fn add_choice(
        &self,
        actor: &Identity,
        poll_id: &PollId,
        collection: ChoiceCollection,
        proposal: NewChoice,
    ) -> Result<Choice> {
        access::ensure_active(actor)?;
        proposal.validate(&self.rules)?;

        let (choice, redeemed) = self
            .ledger
            .transact("add_choice", |tx| {
                let mut poll = tx.require::<Poll>(poll_id)?;
                let mut member = tx.require::<Member>(&actor.member_id)?;
                if !actor.is_admin() && poll.participation(&member.id) != Participation::Joined {
                    return Err(Error::NotJoined(member.id));
                }

                let choice = proposal.clone().into_choice(member.id.clone());
                let redeemed = transitions::apply_add_choice(
                    &mut poll,
                    &mut member,
                    collection,
                    choice,
                    Utc::now(),
                );

                let stored = poll
                    .choices(collection)
                    .last()
                    .cloned()
                    .ok_or_else(|| Error::InvalidChoice("choice was not stored".to_string()))?;
                tx.put(&poll)?;
                if redeemed {
                    tx.put(&member)?;
                }
                Ok((stored, redeemed))
            })
            .await?;

        if redeemed {
            info!("Flake redeemed by proposing a choice");
        }
        info!(%collection, choice_id = %choice.id, "Choice added");
        Ok(choice)
    }

    /// Admin check-in toggle
    #[instrument(skip(self), fields(poll_id = %poll_id, member_id = %member_id))]
    pub async fn toggle_attendance(
        &self,
        actor: &Identity,
        poll_id: &PollId,
        member_id: &MemberId,
    ) -> Result<AttendanceOutcome> {
        access::ensure_admin(actor, "check-in")?;

        let outcome = self
            .ledger
            .transact("toggle_attendance", |tx| {
                let mut poll = tx.require::<Poll>(poll_id)?;
                let mut member = tx.get::<Member>(member_id)?;

                let outcome =
                    transitions::apply_toggle_attendance(&mut poll, member.as_mut(), member_id);

                tx.put(&poll)?;
                if let (true, Some(member)) = (outcome.flake_forgiven, &member) {
                    tx.put(member)?;
                }
                Ok::<_, Error>(outcome)
            })
            .await?;

        info!(
            checked_in = outcome.checked_in,
            forgiven = outcome.flake_forgiven,
            "Attendance toggled"
        );
        Ok(outcome)
    }

    /// Admin flake toggle
    #[instrument(skip(self), fields(poll_id = %poll_id, member_id = %member_id))]
    pub async fn toggle_flake(
        &self,
        actor: &Identity,
        poll_id: &PollId,
        member_id: &MemberId,
    ) -> Result<FlakeOutcome> {
        access::ensure_admin(actor, "flake toggle")?;

        let outcome = self
            .ledger
            .transact("toggle_flake", |tx| {
                let mut poll = tx.require::<Poll>(poll_id)?;
                let mut member = tx.require::<Member>(member_id)?;

                let outcome = transitions::apply_toggle_flake(&mut poll, &mut member);

                if outcome.removed_from_attendees {
                    tx.put(&poll)?;
                }
                tx.put(&member)?;
                Ok::<_, Error>(outcome)
            })
            .await?;

        info!(flaked = outcome.flaked, "Flake toggled");
        Ok(outcome)
    }

    /// Hide or show a poll
    #[instrument(skip(self), fields(poll_id = %poll_id))]
    pub async fn set_hidden(&self, actor: &Identity, poll_id: &PollId, hidden: bool) -> Result<()> {
        access::ensure_admin(actor, "hide poll")?;
        self.update_poll("set_hidden", poll_id, |poll| poll.is_hidden = hidden)
            .await
    }

    /// Move or remove the deadline
    #[instrument(skip(self), fields(poll_id = %poll_id))]
    pub async fn set_deadline(
        &self,
        actor: &Identity,
        poll_id: &PollId,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<()> {
        access::ensure_admin(actor, "set deadline")?;
        self.update_poll("set_deadline", poll_id, |poll| poll.deadline = deadline)
            .await
    }

    /// Delete a poll
    ///
    /// Flakes already counted against it stay on the members.
    #[instrument(skip(self), fields(poll_id = %poll_id))]
    pub async fn delete_poll(&self, actor: &Identity, poll_id: &PollId) -> Result<()> {
        access::ensure_admin(actor, "delete poll")?;

        self.ledger
            .transact("delete_poll", |tx| {
                tx.require::<Poll>(poll_id)?;
                tx.delete::<Poll>(poll_id)?;
                Ok::<_, Error>(())
            })
            .await?;

        info!("Poll deleted");
        Ok(())
    }

    /// Admin direct edit of a member's counters
    #[instrument(skip(self), fields(member_id = %member_id))]
    pub async fn adjust_member_stats(
        &self,
        actor: &Identity,
        member_id: &MemberId,
        update: MemberStatsUpdate,
    ) -> Result<Member> {
        access::ensure_admin(actor, "edit member stats")?;

        let member = self
            .ledger
            .transact("adjust_member_stats", |tx| {
                let mut member = tx.require::<Member>(member_id)?;
                update.apply(&mut member);
                tx.put(&member)?;
                Ok::<_, Error>(member)
            })
            .await?;

        info!(flake_count = member.flake_count, "Member stats adjusted");
        Ok(member)
    }

    /// Display totals for a member across every stored poll
    pub fn member_stats(&self, member_id: &MemberId) -> Result<MemberStats> {
        let member = self.ledger.load::<Member>(member_id)?;
        let polls = self.ledger.list::<Poll>()?;
        Ok(stats::member_stats(&member, &polls))
    }

    async fn update_poll(
        &self,
        name: &'static str,
        poll_id: &PollId,
        mut edit: impl FnMut(&mut Poll),
    ) -> Result<()> {
        self.ledger
            .transact(name, |tx| {
                let mut poll = tx.require::<Poll>(poll_id)?;
                edit(&mut poll);
                tx.put(&poll)?;
                Ok::<_, Error>(())
            })
            .await?;

        debug!(transaction = name, "Poll updated");
        Ok(())
    }
}
