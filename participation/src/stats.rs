//! Member display statistics

use ledger_core::{types::apply_offset, ChoiceCollection, Member, Poll};
use serde::{Deserialize, Serialize};

/// Totals shown on a member's profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStats {
    /// Polls attended, plus the admin offset, floored at zero
    pub attendance: u32,
    /// Polls voted in, plus the admin offset, floored at zero
    pub votes: u32,
    /// Current flake count
    pub flakes: u32,
}

/// Admin direct edit; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStatsUpdate {
    /// New flake count
    pub flake_count: Option<u32>,
    /// New attendance offset
    pub attendance_offset: Option<i32>,
    /// New vote offset
    pub vote_offset: Option<i32>,
}

impl MemberStatsUpdate {
    /// Overwrite the selected counters
    pub fn apply(&self, member: &mut Member) {
        if let Some(count) = self.flake_count {
            member.flake_count = count;
        }
        if let Some(offset) = self.attendance_offset {
            member.attendance_offset = offset;
        }
        if let Some(offset) = self.vote_offset {
            member.vote_offset = offset;
        }
    }
}

/// Derive the display totals from the polls
pub fn member_stats<'a>(member: &Member, polls: impl IntoIterator<Item = &'a Poll>) -> MemberStats {
    let (attended, voted) = polls.into_iter().fold((0u32, 0u32), |(attended, voted), poll| {
        let was_there = poll.confirmed_attendees.contains(&member.id);
        let has_voted = poll.has_vote_in(ChoiceCollection::Dates, &member.id)
            || poll.has_vote_in(ChoiceCollection::Venues, &member.id);
        (attended + was_there as u32, voted + has_voted as u32)
    });

    MemberStats {
        attendance: apply_offset(attended, member.attendance_offset),
        votes: apply_offset(voted, member.vote_offset),
        flakes: member.flake_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledger_core::{Choice, MemberId, PollId, Role};

    fn poll(id: &str) -> Poll {
        let admin = MemberId::new("admin");
        Poll {
            id: PollId::new(id),
            title: id.to_string(),
            description: String::new(),
            date_choices: vec![Choice::new("Fri", admin.clone())],
            venue_choices: vec![Choice::new("A", admin.clone()), Choice::new("B", admin.clone())],
            participants: Default::default(),
            confirmed_attendees: Default::default(),
            finalized_date_id: None,
            finalized_venue_id: None,
            deadline: None,
            is_hidden: false,
            taxi_requesters: Default::default(),
            settlement: None,
            created_by: admin,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_counts_with_offsets() {
        let mut member = Member::new(MemberId::new("m1"), "Minji", Role::Member);
        let mut first = poll("p1");
        let mut second = poll("p2");
        first.confirmed_attendees.insert(member.id.clone());
        first.venue_choices[0].votes.insert(member.id.clone());
        second.date_choices[0].votes.insert(member.id.clone());

        let stats = member_stats(&member, [&first, &second]);
        assert_eq!(stats.attendance, 1);
        assert_eq!(stats.votes, 2);

        member.attendance_offset = -5;
        member.vote_offset = 3;
        let stats = member_stats(&member, [&first, &second]);
        assert_eq!(stats.attendance, 0);
        assert_eq!(stats.votes, 5);
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let mut member = Member::new(MemberId::new("m1"), "Minji", Role::Member);
        member.flake_count = 4;
        member.vote_offset = 2;

        MemberStatsUpdate {
            flake_count: Some(1),
            ..Default::default()
        }
        .apply(&mut member);

        assert_eq!(member.flake_count, 1);
        assert_eq!(member.vote_offset, 2);
    }
}
