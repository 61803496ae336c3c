//! Identity visibility and the membership table read-model.
//!
//! Anonymous games promise their players that nobody can tell who plays
//! which country. Rows tied to such a game show the real account only to
//! the subject and to moderators who are not playing in that game; anyone
//! else sees the country instead.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use liaison_common::weighting::{self, Bucket};
use liaison_common::{Actor, CountryId, GameId, GroupId, UserId};
use liaison_db::entities::group::GroupType;
use liaison_db::entities::{group, group_member};
use liaison_db::repositories::MembershipSet;
use serde::Serialize;

use crate::directory::GameInfo;
use crate::permission;

/// Page a group link points at.
pub const GROUP_PAGE: &str = "group.php";

/// Shown in place of an identity that may not be revealed and has no country.
pub const ANONYMOUS: &str = "Anonymous";

/// Shown when no moderator has weighed in.
pub const NO_MODERATOR: &str = "N/A";

/// Games and usernames needed to render a set of memberships.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub games: HashMap<GameId, GameInfo>,
    pub usernames: HashMap<UserId, String>,
}

impl RenderContext {
    fn username(&self, user_id: UserId) -> String {
        self.usernames
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| format!("User #{user_id}"))
    }

    fn game_of(&self, group: &group::Model) -> Option<&GameInfo> {
        group.game_id.and_then(|id| self.games.get(&id))
    }
}

/// Whether `viewer` may see which account `user_id` is, in the context of `group`.
///
/// A game-scoped group whose game can no longer be found is treated as
/// anonymous with nobody seated.
#[must_use]
pub fn identity_visible(
    viewer: &Actor,
    user_id: UserId,
    group: &group::Model,
    context: &RenderContext,
) -> bool {
    let Some(game_id) = group.game_id else {
        return true;
    };

    match context.games.get(&game_id) {
        Some(game) if !game.anonymous => true,
        Some(game) => {
            viewer.id == user_id || (viewer.is_moderator() && !game.is_participant(viewer.id))
        }
        None => viewer.id == user_id || viewer.is_moderator(),
    }
}

/// An account, or the country standing in for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Identity {
    User { user_id: UserId, username: String },
    Country { country_id: Option<CountryId>, name: String },
}

impl Identity {
    fn resolve(
        viewer: &Actor,
        user_id: UserId,
        country_id: Option<CountryId>,
        group: &group::Model,
        context: &RenderContext,
    ) -> Self {
        if identity_visible(viewer, user_id, group, context) {
            return Self::User {
                user_id,
                username: context.username(user_id),
            };
        }

        let name = country_id
            .and_then(|c| context.game_of(group).and_then(|g| g.country_name(c)))
            .map_or_else(|| ANONYMOUS.to_string(), str::to_string);

        Self::Country { country_id, name }
    }

    /// Text to show for this identity.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::User { username, .. } => username,
            Self::Country { name, .. } => name,
        }
    }
}

/// Which of the three weightings a cell shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WeightingField {
    User,
    Owner,
    Moderator,
}

/// One choice in a weighting selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightingOption {
    pub value: i32,
    pub label: Bucket,
}

/// A weighting as the viewer gets to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WeightingCell {
    Editable {
        field: WeightingField,
        selected: Bucket,
        options: Vec<WeightingOption>,
    },
    ReadOnly {
        bucket: Bucket,
    },
}

impl WeightingCell {
    fn new(field: WeightingField, stored: i32, editable: bool) -> Self {
        let selected = weighting::bucket(stored);
        if !editable {
            return Self::ReadOnly { bucket: selected };
        }

        let options = Bucket::ALL
            .into_iter()
            .map(|label| WeightingOption {
                value: label.threshold(),
                label,
            })
            .collect();

        Self::Editable {
            field,
            selected,
            options,
        }
    }

    /// The bucket shown, editable or not.
    #[must_use]
    pub const fn bucket(&self) -> Bucket {
        match self {
            Self::Editable { selected, .. } => *selected,
            Self::ReadOnly { bucket } => *bucket,
        }
    }

    /// Whether the viewer may change this weighting.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Editable { .. })
    }
}

/// Link to a group page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLink {
    pub id: GroupId,
    pub href: String,
    pub label: String,
    pub group_type: GroupType,
    pub is_active: bool,
}

impl GroupLink {
    fn new(group: &group::Model) -> Self {
        Self {
            id: group.id,
            href: format!("{GROUP_PAGE}?groupID={}", group.id),
            label: format!("#{} {}", group.id, group.name),
            group_type: group.group_type,
            is_active: group.is_active,
        }
    }
}

/// One rendered membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRow {
    pub group: GroupLink,
    pub subject: Identity,
    pub user_weighting: WeightingCell,
    pub owner: Identity,
    pub owner_weighting: WeightingCell,
    pub moderator: String,
    pub mod_weighting: WeightingCell,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Omitted when the row was never changed after creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_at: Option<DateTime<Utc>>,
}

impl MembershipRow {
    fn render(
        group: &group::Model,
        member: &group_member::Model,
        viewer: &Actor,
        context: &RenderContext,
    ) -> Self {
        let created_at: DateTime<Utc> = member.created_at.into();
        let changed_at: DateTime<Utc> = member.changed_at.into();

        Self {
            group: GroupLink::new(group),
            subject: Identity::resolve(viewer, member.user_id, member.country_id, group, context),
            user_weighting: WeightingCell::new(
                WeightingField::User,
                member.user_weighting,
                permission::can_update_user_weighting(viewer, member),
            ),
            owner: Identity::resolve(
                viewer,
                group.owner_user_id,
                group.owner_country_id,
                group,
                context,
            ),
            owner_weighting: WeightingCell::new(
                WeightingField::Owner,
                member.owner_weighting,
                permission::can_update_owner_weighting(viewer, group),
            ),
            moderator: member
                .mod_user_id
                .map_or_else(|| NO_MODERATOR.to_string(), |id| context.username(id)),
            mod_weighting: WeightingCell::new(
                WeightingField::Moderator,
                member.mod_weighting,
                permission::can_update_mod_weighting(viewer),
            ),
            is_active: member.is_active,
            created_at,
            changed_at: (changed_at != created_at).then_some(changed_at),
        }
    }
}

/// Display-ready memberships for one viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipTable {
    pub rows: Vec<MembershipRow>,
}

impl MembershipTable {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render memberships for a viewer, redacting identities per [`identity_visible`].
#[must_use]
pub fn render_membership_table(
    rows: &MembershipSet,
    viewer: &Actor,
    context: &RenderContext,
) -> MembershipTable {
    MembershipTable {
        rows: rows
            .iter()
            .map(|(group, member)| MembershipRow::render(group, member, viewer, context))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::CountrySeat;
    use chrono::Duration;
    use liaison_common::AccountRole;

    fn game(anonymous: bool) -> GameInfo {
        GameInfo {
            id: 42,
            name: "Classic".to_string(),
            anonymous,
            turn: 3,
            phase: "Diplomacy".to_string(),
            season: "Spring".to_string(),
            year: 1902,
            countries: vec![
                CountrySeat {
                    country_id: 3,
                    name: "France".to_string(),
                    user_id: Some(101),
                },
                CountrySeat {
                    country_id: 5,
                    name: "Italy".to_string(),
                    user_id: Some(102),
                },
                CountrySeat {
                    country_id: 7,
                    name: "Russia".to_string(),
                    user_id: Some(50),
                },
            ],
        }
    }

    fn group(game_id: Option<GameId>) -> group::Model {
        group::Model {
            id: 9,
            name: "Classic - #3".to_string(),
            group_type: GroupType::Unknown,
            is_active: true,
            description: "coordinated moves".to_string(),
            moderator_notes: None,
            owner_user_id: 50,
            game_id,
            owner_country_id: Some(7),
            created_at: Utc::now().into(),
            changed_at: Utc::now().into(),
        }
    }

    fn member(user_id: UserId, country_id: Option<CountryId>) -> group_member::Model {
        let now = Utc::now();
        group_member::Model {
            group_id: 9,
            user_id,
            is_active: true,
            user_weighting: 0,
            owner_weighting: 80,
            mod_weighting: 0,
            mod_user_id: None,
            country_id,
            created_at: now.into(),
            changed_at: now.into(),
        }
    }

    fn context(anonymous: bool) -> RenderContext {
        RenderContext {
            games: HashMap::from([(42, game(anonymous))]),
            usernames: HashMap::from([
                (50, "reporter".to_string()),
                (101, "alice".to_string()),
                (102, "bob".to_string()),
                (200, "mod".to_string()),
            ]),
        }
    }

    #[test]
    fn test_ungamed_group_is_fully_visible() {
        let viewer = Actor::new(7, "stranger", AccountRole::User);
        assert!(identity_visible(&viewer, 101, &group(None), &context(true)));
    }

    #[test]
    fn test_public_game_is_fully_visible() {
        let viewer = Actor::new(7, "stranger", AccountRole::User);
        assert!(identity_visible(&viewer, 101, &group(Some(42)), &context(false)));
    }

    #[test]
    fn test_anonymous_game_visibility() {
        let g = group(Some(42));
        let ctx = context(true);

        let subject = Actor::new(101, "alice", AccountRole::User);
        let player = Actor::new(50, "reporter", AccountRole::User);
        let outside_mod = Actor::new(200, "mod", AccountRole::Moderator);
        let playing_mod = Actor::new(102, "bob", AccountRole::Moderator);

        assert!(identity_visible(&subject, 101, &g, &ctx));
        assert!(!identity_visible(&player, 101, &g, &ctx));
        assert!(identity_visible(&outside_mod, 101, &g, &ctx));
        assert!(!identity_visible(&playing_mod, 101, &g, &ctx));
    }

    #[test]
    fn test_missing_game_is_treated_as_anonymous() {
        let g = group(Some(77));
        let ctx = context(true);

        let player = Actor::new(50, "reporter", AccountRole::User);
        let moderator = Actor::new(200, "mod", AccountRole::Moderator);

        assert!(!identity_visible(&player, 101, &g, &ctx));
        assert!(identity_visible(&moderator, 101, &g, &ctx));
        let identity = Identity::resolve(&player, 101, Some(3), &g, &ctx);
        assert_eq!(identity.display_name(), ANONYMOUS);
    }

    #[test]
    fn test_redacted_identity_uses_country_name() {
        let g = group(Some(42));
        let ctx = context(true);
        let player = Actor::new(50, "reporter", AccountRole::User);

        let with_country = Identity::resolve(&player, 101, Some(3), &g, &ctx);
        assert_eq!(
            with_country,
            Identity::Country {
                country_id: Some(3),
                name: "France".to_string()
            }
        );

        let without_country = Identity::resolve(&player, 101, None, &g, &ctx);
        assert_eq!(without_country.display_name(), ANONYMOUS);
    }

    #[test]
    fn test_row_cells_follow_writers() {
        let g = group(None);
        let m = member(101, None);
        let ctx = context(false);

        let owner_row = MembershipRow::render(&g, &m, &Actor::new(50, "reporter", AccountRole::User), &ctx);
        assert!(!owner_row.user_weighting.is_editable());
        assert!(owner_row.owner_weighting.is_editable());
        assert!(!owner_row.mod_weighting.is_editable());
        assert_eq!(owner_row.owner_weighting.bucket(), Bucket::Strong);
        assert_eq!(owner_row.moderator, NO_MODERATOR);

        let subject_row = MembershipRow::render(&g, &m, &Actor::new(101, "alice", AccountRole::User), &ctx);
        assert!(subject_row.user_weighting.is_editable());
        assert!(!subject_row.owner_weighting.is_editable());

        let mod_row = MembershipRow::render(&g, &m, &Actor::new(200, "mod", AccountRole::Moderator), &ctx);
        assert!(mod_row.mod_weighting.is_editable());
        assert!(!mod_row.owner_weighting.is_editable());
    }

    #[test]
    fn test_editable_cell_offers_every_bucket() {
        let cell = WeightingCell::new(WeightingField::User, 40, true);
        match cell {
            WeightingCell::Editable {
                selected, options, ..
            } => {
                assert_eq!(selected, Bucket::Mid);
                assert_eq!(options.len(), Bucket::ALL.len());
                assert_eq!(options[0].value, -100);
                assert_eq!(options[5].label, Bucket::Strong);
            }
            WeightingCell::ReadOnly { .. } => panic!("expected an editable cell"),
        }
    }

    #[test]
    fn test_changed_timestamp_omitted_when_equal() {
        let g = group(None);
        let ctx = context(false);
        let viewer = Actor::new(50, "reporter", AccountRole::User);

        let unchanged = member(101, None);
        let row = MembershipRow::render(&g, &unchanged, &viewer, &ctx);
        assert!(row.changed_at.is_none());

        let mut changed = member(101, None);
        changed.changed_at = (Utc::now() + Duration::minutes(5)).into();
        let row = MembershipRow::render(&g, &changed, &viewer, &ctx);
        assert!(row.changed_at.is_some());
    }

    #[test]
    fn test_group_link() {
        let link = GroupLink::new(&group(None));
        assert_eq!(link.href, "group.php?groupID=9");
        assert_eq!(link.label, "#9 Classic - #3");
    }
}
