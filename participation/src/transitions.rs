//! Pure state transitions over a (poll, member) snapshot
//!
//! Every function here takes the documents exactly as a transaction read them
//! and mutates them in place. Nothing is cached between calls, so re-running a
//! transition on a fresh snapshot after a conflict makes the same decision the
//! store would have made had there been no conflict.
//!
//! # Penalty bookkeeping
//!
//! ```text
//! Joined ──decline──▶ Declined      flake +1, poll added to flaked_events
//!                                   (only if not already there)
//! vote / add choice with votes in   flake −1, poll removed
//! both collections, before deadline
//! admin check-in                    flake −1, poll removed
//! admin flake toggle                +1 / −1, bypasses history
//! ```

use chrono::{DateTime, Utc};
use ledger_core::{
    Choice, ChoiceCollection, ChoiceId, Member, MemberId, Participation, ParticipationRecord,
    ParticipationStatus, Poll,
};

use crate::{Error, Result};

/// Result of a join/decline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipationOutcome {
    /// State before the transition
    pub previous: Participation,
    /// State after the transition
    pub current: ParticipationStatus,
    /// Votes removed by a decline
    pub votes_retracted: usize,
    /// Whether this transition counted a new flake
    pub flake_accrued: bool,
}

/// Result of a vote toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Whether the vote is present after the toggle
    pub voted: bool,
    /// Whether an outstanding flake was redeemed
    pub redeemed: bool,
}

/// Result of an admin check-in toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceOutcome {
    /// Whether the member is now a confirmed attendee
    pub checked_in: bool,
    /// Whether an outstanding flake was forgiven
    pub flake_forgiven: bool,
}

/// Result of an admin flake toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlakeOutcome {
    /// Whether the member is now flaked for the poll
    pub flaked: bool,
    /// Whether the member had to be removed from the attendees first
    pub removed_from_attendees: bool,
}

/// Reject actions after the deadline
pub fn ensure_open(poll: &Poll, now: DateTime<Utc>) -> Result<()> {
    match poll.deadline {
        Some(deadline) if poll.is_deadline_passed(now) => Err(Error::DeadlinePassed { deadline }),
        _ => Ok(()),
    }
}

/// Join or decline
///
/// Declining retracts every vote of the member. A decline that follows a join
/// in this snapshot counts one flake, guarded by `flaked_events`, so retries
/// and repeated declines never count twice.
pub fn apply_participation(
    poll: &mut Poll,
    member: &mut Member,
    status: ParticipationStatus,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> ParticipationOutcome {
    let previous = poll.participation(&member.id);
    let is_non_drinker = poll.is_non_drinker(&member.id);

    let (decline_reason, votes_retracted) = match status {
        ParticipationStatus::Joined => (None, 0),
        ParticipationStatus::Declined => (reason, poll.retract_votes(&member.id)),
    };

    poll.participants.insert(
        member.id.clone(),
        ParticipationRecord {
            status,
            decline_reason,
            is_non_drinker,
            updated_at: now,
        },
    );

    let flake_accrued = previous == Participation::Joined
        && status == ParticipationStatus::Declined
        && member.accrue_flake(&poll.id);

    ParticipationOutcome {
        previous,
        current: status,
        votes_retracted,
        flake_accrued,
    }
}

/// Toggle a vote, then try to redeem an outstanding flake
pub fn apply_vote(
    poll: &mut Poll,
    member: &mut Member,
    collection: ChoiceCollection,
    choice_id: &ChoiceId,
    now: DateTime<Utc>,
) -> Result<VoteOutcome> {
    ensure_open(poll, now)?;
    if poll.participation(&member.id) != Participation::Joined {
        return Err(Error::NotJoined(member.id.clone()));
    }

    let choice = poll
        .choice_mut(collection, choice_id)
        .ok_or_else(|| Error::ChoiceNotFound {
            collection,
            choice_id: choice_id.clone(),
        })?;
    let voted = choice.toggle_vote(&member.id);
    let redeemed = try_redeem(poll, member, now);

    Ok(VoteOutcome { voted, redeemed })
}

/// Append a proposed choice, seeded with its creator's vote
///
/// Returns whether the seeded vote redeemed an outstanding flake.
pub fn apply_add_choice(
    poll: &mut Poll,
    member: &mut Member,
    collection: ChoiceCollection,
    mut choice: Choice,
    now: DateTime<Utc>,
) -> bool {
    choice.created_by = member.id.clone();
    choice.votes.insert(member.id.clone());
    poll.choices_mut(collection).push(choice);

    try_redeem(poll, member, now)
}

/// Forgive the poll's flake if the member now votes in both collections
///
/// Runs against the post-vote snapshot; removing the poll from
/// `flaked_events` makes it fire at most once per flake.
pub fn try_redeem(poll: &Poll, member: &mut Member, now: DateTime<Utc>) -> bool {
    member.has_flaked(&poll.id)
        && !poll.is_deadline_passed(now)
        && poll.has_vote_in(ChoiceCollection::Dates, &member.id)
        && poll.has_vote_in(ChoiceCollection::Venues, &member.id)
        && member.forgive_flake(&poll.id)
}

/// Admin check-in toggle; checking in forgives an outstanding flake
///
/// `member` is None when the attendee has no member document, in which case
/// there is no penalty to forgive.
pub fn apply_toggle_attendance(
    poll: &mut Poll,
    member: Option<&mut Member>,
    member_id: &MemberId,
) -> AttendanceOutcome {
    if poll.confirmed_attendees.remove(member_id) {
        return AttendanceOutcome {
            checked_in: false,
            flake_forgiven: false,
        };
    }

    poll.confirmed_attendees.insert(member_id.clone());
    let flake_forgiven = member.map_or(false, |m| m.forgive_flake(&poll.id));

    AttendanceOutcome {
        checked_in: true,
        flake_forgiven,
    }
}

/// Admin flake toggle
///
/// Setting a flake first removes the member from the attendees: a member is
/// never both flaked and checked in.
pub fn apply_toggle_flake(poll: &mut Poll, member: &mut Member) -> FlakeOutcome {
    if member.forgive_flake(&poll.id) {
        return FlakeOutcome {
            flaked: false,
            removed_from_attendees: false,
        };
    }

    let removed_from_attendees = poll.confirmed_attendees.remove(&member.id);
    member.accrue_flake(&poll.id);

    FlakeOutcome {
        flaked: true,
        removed_from_attendees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ledger_core::{PollId, Role};
    use std::collections::{BTreeMap, BTreeSet};

    fn poll() -> Poll {
        let admin = MemberId::new("admin");
        Poll {
            id: PollId::new("p1"),
            title: "Dinner".to_string(),
            description: String::new(),
            date_choices: vec![Choice::new("Fri", admin.clone())],
            venue_choices: vec![
                Choice::new("Noodles", admin.clone()),
                Choice::new("BBQ", admin.clone()),
            ],
            participants: BTreeMap::new(),
            confirmed_attendees: BTreeSet::new(),
            finalized_date_id: None,
            finalized_venue_id: None,
            deadline: None,
            is_hidden: false,
            taxi_requesters: BTreeSet::new(),
            settlement: None,
            created_by: admin,
            created_at: Utc::now(),
        }
    }

    fn member() -> Member {
        Member::new(MemberId::new("m1"), "Minji", Role::Member)
    }

    fn join(poll: &mut Poll, member: &mut Member) {
        apply_participation(poll, member, ParticipationStatus::Joined, None, Utc::now());
    }

    fn decline(poll: &mut Poll, member: &mut Member) -> ParticipationOutcome {
        apply_participation(
            poll,
            member,
            ParticipationStatus::Declined,
            Some("sick".to_string()),
            Utc::now(),
        )
    }

    fn vote_both(poll: &mut Poll, member: &mut Member) -> (VoteOutcome, VoteOutcome) {
        let date = poll.date_choices[0].id.clone();
        let venue = poll.venue_choices[0].id.clone();
        let now = Utc::now();
        (
            apply_vote(poll, member, ChoiceCollection::Dates, &date, now).unwrap(),
            apply_vote(poll, member, ChoiceCollection::Venues, &venue, now).unwrap(),
        )
    }

    #[test]
    fn test_join_does_not_touch_flakes() {
        let mut poll = poll();
        let mut member = member();
        join(&mut poll, &mut member);

        assert_eq!(poll.participation(&member.id), Participation::Joined);
        assert_eq!(member.flake_count, 0);
    }

    #[test]
    fn test_decline_without_join_is_not_a_flake() {
        let mut poll = poll();
        let mut member = member();
        let outcome = decline(&mut poll, &mut member);

        assert_eq!(outcome.previous, Participation::NoResponse);
        assert!(!outcome.flake_accrued);
        assert_eq!(member.flake_count, 0);
        assert_eq!(
            poll.participants[&member.id].decline_reason.as_deref(),
            Some("sick")
        );
    }

    #[test]
    fn test_repeated_decline_accrues_once() {
        let mut poll = poll();
        let mut member = member();
        join(&mut poll, &mut member);

        assert!(decline(&mut poll, &mut member).flake_accrued);
        assert!(!decline(&mut poll, &mut member).flake_accrued);
        assert_eq!(member.flake_count, 1);
    }

    #[test]
    fn test_second_cycle_does_not_double_count() {
        let mut poll = poll();
        let mut member = member();

        join(&mut poll, &mut member);
        decline(&mut poll, &mut member);
        join(&mut poll, &mut member);
        let outcome = decline(&mut poll, &mut member);

        assert!(!outcome.flake_accrued);
        assert_eq!(member.flake_count, 1);
    }

    #[test]
    fn test_decline_clears_votes() {
        let mut poll = poll();
        let mut member = member();
        join(&mut poll, &mut member);
        vote_both(&mut poll, &mut member);

        let outcome = decline(&mut poll, &mut member);
        assert_eq!(outcome.votes_retracted, 2);
        assert!(!poll.has_vote_in(ChoiceCollection::Dates, &member.id));
        assert!(!poll.has_vote_in(ChoiceCollection::Venues, &member.id));
    }

    #[test]
    fn test_rejoin_keeps_non_drinker_flag() {
        let mut poll = poll();
        let mut member = member();
        join(&mut poll, &mut member);
        poll.participants.get_mut(&member.id).unwrap().is_non_drinker = true;

        decline(&mut poll, &mut member);
        join(&mut poll, &mut member);

        let record = &poll.participants[&member.id];
        assert!(record.is_non_drinker);
        assert!(record.decline_reason.is_none());
    }

    #[test]
    fn test_vote_requires_join() {
        let mut poll = poll();
        let mut member = member();
        let date = poll.date_choices[0].id.clone();

        let err = apply_vote(&mut poll, &mut member, ChoiceCollection::Dates, &date, Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::NotJoined(_)));
        assert_eq!(poll.date_choices[0].vote_count(), 0);
    }

    #[test]
    fn test_vote_after_deadline_rejected() {
        let mut poll = poll();
        let mut member = member();
        join(&mut poll, &mut member);
        poll.deadline = Some(Utc::now() - Duration::hours(1));
        let date = poll.date_choices[0].id.clone();

        let err = apply_vote(&mut poll, &mut member, ChoiceCollection::Dates, &date, Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::DeadlinePassed { .. }));
    }

    #[test]
    fn test_vote_unknown_choice() {
        let mut poll = poll();
        let mut member = member();
        join(&mut poll, &mut member);

        let err = apply_vote(
            &mut poll,
            &mut member,
            ChoiceCollection::Venues,
            &ChoiceId::new("nope"),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ChoiceNotFound { .. }));
    }

    #[test]
    fn test_vote_toggles() {
        let mut poll = poll();
        let mut member = member();
        join(&mut poll, &mut member);
        let venue = poll.venue_choices[1].id.clone();

        let first = apply_vote(&mut poll, &mut member, ChoiceCollection::Venues, &venue, Utc::now()).unwrap();
        let second = apply_vote(&mut poll, &mut member, ChoiceCollection::Venues, &venue, Utc::now()).unwrap();
        assert!(first.voted);
        assert!(!second.voted);
        assert_eq!(poll.venue_choices[1].vote_count(), 0);
    }

    #[test]
    fn test_redemption_exactly_once() {
        let mut poll = poll();
        let mut member = member();
        join(&mut poll, &mut member);
        decline(&mut poll, &mut member);
        join(&mut poll, &mut member);

        let (date_vote, venue_vote) = vote_both(&mut poll, &mut member);
        assert!(!date_vote.redeemed);
        assert!(venue_vote.redeemed);
        assert_eq!(member.flake_count, 0);

        // More votes do not redeem again
        let other_venue = poll.venue_choices[1].id.clone();
        let extra = apply_vote(&mut poll, &mut member, ChoiceCollection::Venues, &other_venue, Utc::now()).unwrap();
        assert!(!extra.redeemed);
        assert_eq!(member.flake_count, 0);
    }

    #[test]
    fn test_redemption_ignores_other_polls_flakes() {
        let mut poll = poll();
        let mut member = member();
        member.accrue_flake(&PollId::new("other"));
        join(&mut poll, &mut member);

        vote_both(&mut poll, &mut member);
        assert_eq!(member.flake_count, 1);
    }

    #[test]
    fn test_add_choice_seeds_vote_and_can_redeem() {
        let mut poll = poll();
        let mut member = member();
        join(&mut poll, &mut member);
        decline(&mut poll, &mut member);
        join(&mut poll, &mut member);

        let date = poll.date_choices[0].id.clone();
        apply_vote(&mut poll, &mut member, ChoiceCollection::Dates, &date, Utc::now()).unwrap();
        assert_eq!(member.flake_count, 1);

        let redeemed = apply_add_choice(
            &mut poll,
            &mut member,
            ChoiceCollection::Venues,
            Choice::new("Tacos", MemberId::new("ignored")),
            Utc::now(),
        );
        assert!(redeemed);
        let added = poll.venue_choices.last().unwrap();
        assert_eq!(added.created_by, member.id);
        assert!(added.votes.contains(&member.id));
    }

    #[test]
    fn test_check_in_forgives_flake() {
        let mut poll = poll();
        let mut member = member();
        join(&mut poll, &mut member);
        decline(&mut poll, &mut member);
        assert_eq!(member.flake_count, 1);

        let id = member.id.clone();
        let outcome = apply_toggle_attendance(&mut poll, Some(&mut member), &id);
        assert!(outcome.checked_in && outcome.flake_forgiven);
        assert_eq!(member.flake_count, 0);
        assert!(member.flaked_events.is_empty());

        let outcome = apply_toggle_attendance(&mut poll, Some(&mut member), &id);
        assert!(!outcome.checked_in);
        assert!(!poll.confirmed_attendees.contains(&id));
        assert_eq!(member.flake_count, 0);
    }

    #[test]
    fn test_flake_toggle_removes_attendance() {
        let mut poll = poll();
        let mut member = member();
        poll.confirmed_attendees.insert(member.id.clone());

        let set = apply_toggle_flake(&mut poll, &mut member);
        assert!(set.flaked && set.removed_from_attendees);
        assert_eq!(member.flake_count, 1);
        assert!(!poll.confirmed_attendees.contains(&member.id));

        let cleared = apply_toggle_flake(&mut poll, &mut member);
        assert!(!cleared.flaked);
        assert_eq!(member.flake_count, 0);
        assert!(!member.has_flaked(&poll.id));
    }
}
