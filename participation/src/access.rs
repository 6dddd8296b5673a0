//! Caller checks shared by every mutating operation

use ledger_core::{Denied, Identity, MemberId, Scope};

use crate::{Error, Result};

fn check(actor: &Identity, scope: Scope<'_>, action: &str) -> Result<()> {
    actor.authorize(scope).map_err(|denied| match denied {
        Denied::Banned => Error::Banned(actor.member_id.clone()),
        Denied::NotAdmin => Error::PermissionDenied(format!("{} requires the admin role", action)),
        Denied::OtherMember(member_id) => Error::PermissionDenied(format!(
            "{} cannot act for {}",
            actor.member_id, member_id
        )),
    })
}

/// Banned callers may not mutate anything
pub fn ensure_active(actor: &Identity) -> Result<()> {
    check(actor, Scope::Any, "this")
}

/// Admin-only operations
pub fn ensure_admin(actor: &Identity, action: &str) -> Result<()> {
    check(actor, Scope::Admin, action)
}

/// Members act for themselves; admins may act for anyone
pub fn ensure_self_or_admin(actor: &Identity, member_id: &MemberId) -> Result<()> {
    check(actor, Scope::SelfOrAdmin(member_id), "acting for another member")
}
