//! Identifiers and member documents
//!
//! Identifiers are opaque strings supplied by the auth layer (members) or
//! generated here (polls, choices).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::document::Document;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get as string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

string_id!(
    /// Member identifier, as issued by the auth layer
    MemberId
);

string_id!(
    /// Poll (event) identifier
    PollId
);

string_id!(
    /// Date or venue choice identifier
    ChoiceId
);

impl PollId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl ChoiceId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Member role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Regular member
    Member,
    /// May finalize, check in, edit penalties and settle bills
    Admin,
}

/// Caller identity handed over by the auth layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Who is acting
    pub member_id: MemberId,
    /// Their role
    pub role: Role,
    /// Banned members may not mutate anything
    pub is_banned: bool,
}

impl Identity {
    /// Identity of a regular, non-banned member
    pub fn member(member_id: impl Into<MemberId>) -> Self {
        Self {
            member_id: member_id.into(),
            role: Role::Member,
            is_banned: false,
        }
    }

    /// Identity of a non-banned admin
    pub fn admin(member_id: impl Into<MemberId>) -> Self {
        Self {
            member_id: member_id.into(),
            role: Role::Admin,
            is_banned: false,
        }
    }

    /// Whether the caller holds the admin role
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Check the caller against what the operation requires
    ///
    /// A ban is reported before any role check.
    pub fn authorize(&self, scope: Scope<'_>) -> std::result::Result<(), Denied> {
        if self.is_banned {
            return Err(Denied::Banned);
        }
        match scope {
            Scope::Any => Ok(()),
            Scope::Admin if !self.is_admin() => Err(Denied::NotAdmin),
            Scope::SelfOrAdmin(member_id) if &self.member_id != member_id && !self.is_admin() => {
                Err(Denied::OtherMember(member_id.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// What an operation requires of its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Any non-banned caller
    Any,
    /// Admins only
    Admin,
    /// The member themselves, or an admin
    SelfOrAdmin(&'a MemberId),
}

/// Why a caller was turned away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denied {
    /// The caller is banned
    Banned,
    /// The operation needs the admin role
    NotAdmin,
    /// The caller tried to act for another member
    OtherMember(MemberId),
}

/// Member document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Member ID
    pub id: MemberId,

    /// Name shown in lists
    pub display_name: String,

    /// Optional nickname
    pub nickname: Option<String>,

    /// Avatar image reference
    pub avatar_url: Option<String>,

    /// Role
    pub role: Role,

    /// Banned flag
    pub is_banned: bool,

    /// Cumulative no-show penalties
    pub flake_count: u32,

    /// Polls already counted toward `flake_count`
    pub flaked_events: BTreeSet<PollId>,

    /// Admin correction added to the attendance total
    pub attendance_offset: i32,

    /// Admin correction added to the vote total
    pub vote_offset: i32,

    /// First registration
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// New member with clean counters
    pub fn new(id: MemberId, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            nickname: None,
            avatar_url: None,
            role,
            is_banned: false,
            flake_count: 0,
            flaked_events: BTreeSet::new(),
            attendance_offset: 0,
            vote_offset: 0,
            created_at: Utc::now(),
        }
    }

    /// Whether a penalty for this poll is still outstanding
    pub fn has_flaked(&self, poll_id: &PollId) -> bool {
        self.flaked_events.contains(poll_id)
    }

    /// Count a flake for the poll. Returns false if it was already counted.
    pub fn accrue_flake(&mut self, poll_id: &PollId) -> bool {
        if !self.flaked_events.insert(poll_id.clone()) {
            return false;
        }
        self.flake_count += 1;
        true
    }

    /// Resolve the outstanding flake for the poll. Returns false if there was none.
    pub fn forgive_flake(&mut self, poll_id: &PollId) -> bool {
        if !self.flaked_events.remove(poll_id) {
            return false;
        }
        // Admin edits may have pushed the count below the set size.
        self.flake_count = self.flake_count.saturating_sub(1);
        true
    }

    /// Identity derived from the stored document
    pub fn identity(&self) -> Identity {
        Identity {
            member_id: self.id.clone(),
            role: self.role,
            is_banned: self.is_banned,
        }
    }

    /// Attendance total for display
    pub fn displayed_attendance(&self, counted: u32) -> u32 {
        apply_offset(counted, self.attendance_offset)
    }

    /// Vote participation total for display
    pub fn displayed_votes(&self, counted: u32) -> u32 {
        apply_offset(counted, self.vote_offset)
    }
}

impl Document for Member {
    const COLLECTION: &'static str = "members";
    type Id = MemberId;

    fn id(&self) -> &MemberId {
        &self.id
    }
}

/// Add a signed offset, flooring at zero
pub fn apply_offset(counted: u32, offset: i32) -> u32 {
    let total = i64::from(counted) + i64::from(offset);
    total.clamp(0, i64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> Member {
        Member::new(MemberId::new("m1"), "Minji", Role::Member)
    }

    #[test]
    fn test_accrue_flake_once_per_poll() {
        let mut member = member();
        let poll = PollId::new("p1");

        assert!(member.accrue_flake(&poll));
        assert!(!member.accrue_flake(&poll));
        assert_eq!(member.flake_count, 1);
        assert!(member.has_flaked(&poll));
    }

    #[test]
    fn test_forgive_flake_requires_outstanding_flake() {
        let mut member = member();
        let poll = PollId::new("p1");

        assert!(!member.forgive_flake(&poll));
        member.accrue_flake(&poll);
        assert!(member.forgive_flake(&poll));
        assert_eq!(member.flake_count, 0);
        assert!(member.flaked_events.is_empty());
    }

    #[test]
    fn test_forgive_after_admin_reset_floors_at_zero() {
        let mut member = member();
        let poll = PollId::new("p1");
        member.accrue_flake(&poll);
        member.flake_count = 0; // admin override

        assert!(member.forgive_flake(&poll));
        assert_eq!(member.flake_count, 0);
    }

    #[test]
    fn test_displayed_totals_floor_at_zero() {
        let mut member = member();
        member.attendance_offset = -5;
        member.vote_offset = 2;

        assert_eq!(member.displayed_attendance(3), 0);
        assert_eq!(member.displayed_attendance(7), 2);
        assert_eq!(member.displayed_votes(1), 3);
    }

    #[test]
    fn test_authorize_reports_ban_first() {
        let mut admin = Identity::admin("a1");
        assert_eq!(admin.authorize(Scope::Admin), Ok(()));
        admin.is_banned = true;
        assert_eq!(admin.authorize(Scope::Admin), Err(Denied::Banned));
        assert_eq!(admin.authorize(Scope::Any), Err(Denied::Banned));
    }

    #[test]
    fn test_authorize_scopes() {
        let member = Identity::member("m1");
        let other = MemberId::new("m2");

        assert_eq!(member.authorize(Scope::Admin), Err(Denied::NotAdmin));
        assert_eq!(member.authorize(Scope::SelfOrAdmin(&member.member_id)), Ok(()));
        assert_eq!(
            member.authorize(Scope::SelfOrAdmin(&other)),
            Err(Denied::OtherMember(other.clone()))
        );
        assert_eq!(Identity::admin("a1").authorize(Scope::SelfOrAdmin(&other)), Ok(()));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(PollId::generate(), PollId::generate());
        assert_ne!(ChoiceId::generate(), ChoiceId::generate());
    }
}
