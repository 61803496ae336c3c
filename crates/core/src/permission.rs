//! Who may do what to a relationship group.
//!
//! Every check takes the acting identity explicitly. The `can_*` functions
//! answer the question; the `require_*` functions turn a refusal into
//! [`AppError::PermissionDenied`] naming the operation.

use liaison_common::{AccountRole, Actor, AppError, AppResult};
use liaison_db::entities::{group, group_member};

/// Whether the actor may create groups.
#[must_use]
pub const fn can_create(actor: &Actor) -> bool {
    actor.has_user_standing()
}

/// Whether the actor may change a group or its member list.
#[must_use]
pub const fn can_modify(group: &group::Model, actor: &Actor) -> bool {
    match actor.role {
        AccountRole::Moderator => true,
        AccountRole::User => actor.id == group.owner_user_id,
        AccountRole::Guest | AccountRole::Banned => false,
    }
}

/// Whether the actor may add a subject holding `subject_role` to the group.
#[must_use]
pub const fn can_add(group: &group::Model, actor: &Actor, subject_role: AccountRole) -> bool {
    can_modify(group, actor) && subject_role.has_user_standing()
}

/// Only the subject sets their own weighting.
#[must_use]
pub const fn can_update_user_weighting(actor: &Actor, member: &group_member::Model) -> bool {
    actor.id == member.user_id
}

/// Only the group owner sets the owner weighting.
#[must_use]
pub const fn can_update_owner_weighting(actor: &Actor, group: &group::Model) -> bool {
    actor.id == group.owner_user_id
}

/// Any moderator may set the moderator weighting.
#[must_use]
pub const fn can_update_mod_weighting(actor: &Actor) -> bool {
    actor.is_moderator()
}

/// Moderator notes are moderator-only.
#[must_use]
pub const fn can_set_moderator_notes(actor: &Actor) -> bool {
    actor.is_moderator()
}

/// Whether the actor may view and discuss a group.
///
/// `members` may contain rows of other groups; only active rows of this
/// group count.
#[must_use]
pub fn can_comment<'a>(
    group: &group::Model,
    actor: &Actor,
    members: impl IntoIterator<Item = &'a group_member::Model>,
) -> bool {
    actor.is_moderator()
        || actor.id == group.owner_user_id
        || members
            .into_iter()
            .any(|m| m.group_id == group.id && m.user_id == actor.id && m.is_active)
}

fn require(allowed: bool, operation: &str) -> AppResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(format!(
            "Not allowed to {operation}"
        )))
    }
}

/// Fail unless the actor may create groups.
pub fn require_create(actor: &Actor) -> AppResult<()> {
    require(can_create(actor), "create a relationship group")
}

/// Fail unless the actor may modify the group.
pub fn require_modify(group: &group::Model, actor: &Actor) -> AppResult<()> {
    require(can_modify(group, actor), "modify this group")
}

/// Fail unless the actor may add the subject to the group.
pub fn require_add(group: &group::Model, actor: &Actor, subject_role: AccountRole) -> AppResult<()> {
    require(can_add(group, actor, subject_role), "add this user to the group")
}

/// Fail unless the actor is the membership's subject.
pub fn require_update_user_weighting(actor: &Actor, member: &group_member::Model) -> AppResult<()> {
    require(
        can_update_user_weighting(actor, member),
        "update the user weighting",
    )
}

/// Fail unless the actor owns the group.
pub fn require_update_owner_weighting(actor: &Actor, group: &group::Model) -> AppResult<()> {
    require(
        can_update_owner_weighting(actor, group),
        "update the owner weighting",
    )
}

/// Fail unless the actor is a moderator.
pub fn require_update_mod_weighting(actor: &Actor) -> AppResult<()> {
    require(can_update_mod_weighting(actor), "update the moderator weighting")
}

/// Fail unless the actor may write moderator notes.
pub fn require_set_moderator_notes(actor: &Actor) -> AppResult<()> {
    require(can_set_moderator_notes(actor), "set moderator notes")
}

/// Fail unless the actor may view the group.
pub fn require_comment<'a>(
    group: &group::Model,
    actor: &Actor,
    members: impl IntoIterator<Item = &'a group_member::Model>,
) -> AppResult<()> {
    require(can_comment(group, actor, members), "view this group")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use liaison_db::entities::group::GroupType;

    fn group_owned_by(owner_user_id: i64) -> group::Model {
        group::Model {
            id: 1,
            name: "Club".to_string(),
            group_type: GroupType::Other,
            is_active: true,
            description: "chess club".to_string(),
            moderator_notes: None,
            owner_user_id,
            game_id: None,
            owner_country_id: None,
            created_at: Utc::now().into(),
            changed_at: Utc::now().into(),
        }
    }

    fn member(group_id: i64, user_id: i64, is_active: bool) -> group_member::Model {
        group_member::Model {
            group_id,
            user_id,
            is_active,
            user_weighting: 0,
            owner_weighting: 0,
            mod_weighting: 0,
            mod_user_id: None,
            country_id: None,
            created_at: Utc::now().into(),
            changed_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_create_requires_user_standing() {
        assert!(can_create(&Actor::new(1, "u", AccountRole::User)));
        assert!(can_create(&Actor::new(1, "m", AccountRole::Moderator)));
        assert!(!can_create(&Actor::new(1, "g", AccountRole::Guest)));
        assert!(!can_create(&Actor::new(1, "b", AccountRole::Banned)));
    }

    #[test]
    fn test_modify_owner_or_moderator() {
        let group = group_owned_by(10);

        assert!(can_modify(&group, &Actor::new(10, "owner", AccountRole::User)));
        assert!(can_modify(&group, &Actor::new(99, "mod", AccountRole::Moderator)));
        assert!(!can_modify(&group, &Actor::new(11, "other", AccountRole::User)));
        // A banned owner keeps the row but loses the right to change it.
        assert!(!can_modify(&group, &Actor::new(10, "owner", AccountRole::Banned)));
    }

    #[test]
    fn test_add_checks_subject_standing() {
        let group = group_owned_by(10);
        let owner = Actor::new(10, "owner", AccountRole::User);

        assert!(can_add(&group, &owner, AccountRole::User));
        assert!(can_add(&group, &owner, AccountRole::Moderator));
        assert!(!can_add(&group, &owner, AccountRole::Banned));
        assert!(!can_add(&group, &owner, AccountRole::Guest));
    }

    #[test]
    fn test_weighting_writers() {
        let group = group_owned_by(10);
        let row = member(1, 20, true);
        let subject = Actor::new(20, "subject", AccountRole::User);
        let owner = Actor::new(10, "owner", AccountRole::User);
        let moderator = Actor::new(99, "mod", AccountRole::Moderator);

        assert!(can_update_user_weighting(&subject, &row));
        assert!(!can_update_user_weighting(&owner, &row));
        assert!(!can_update_user_weighting(&moderator, &row));

        assert!(can_update_owner_weighting(&owner, &group));
        assert!(!can_update_owner_weighting(&subject, &group));
        assert!(!can_update_owner_weighting(&moderator, &group));

        assert!(can_update_mod_weighting(&moderator));
        assert!(!can_update_mod_weighting(&owner));
    }

    #[test]
    fn test_comment_counts_active_rows_of_this_group_only() {
        let group = group_owned_by(10);
        let viewer = Actor::new(20, "viewer", AccountRole::User);
        let none: [group_member::Model; 0] = [];

        assert!(can_comment(&group, &viewer, &[member(1, 20, true)]));
        assert!(!can_comment(&group, &viewer, &[member(1, 20, false)]));
        assert!(!can_comment(&group, &viewer, &[member(2, 20, true)]));
        assert!(!can_comment(&group, &viewer, &none));
        assert!(can_comment(
            &group,
            &Actor::new(99, "mod", AccountRole::Moderator),
            &none
        ));
    }

    #[test]
    fn test_denial_names_operation() {
        let group = group_owned_by(10);
        let other = Actor::new(11, "other", AccountRole::User);

        let err = require_update_owner_weighting(&other, &group).unwrap_err();
        assert!(matches!(&err, AppError::PermissionDenied(msg) if msg.contains("owner weighting")));
    }
}
