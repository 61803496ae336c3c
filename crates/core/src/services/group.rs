//! Relationship group service.

use std::collections::{HashMap, HashSet};

use liaison_common::{Actor, AppError, AppResult, CountryId, GameId, GroupId, UserId};
use liaison_db::entities::group::GroupType;
use liaison_db::entities::group;
use liaison_db::repositories::{
    GroupLabel, MembershipFilter, MembershipSet, NewGroup, RelationshipRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::directory::{GameDirectoryService, GameInfo, UserDirectoryService, UserRecord};
use crate::permission;
use crate::visibility::{
    MembershipTable, RenderContext, identity_visible, render_membership_table,
};

/// Minimum length of a game reference that justifies a suspicion group.
const MIN_GAME_REFERENCE_LEN: usize = 5;

/// Input for creating a group.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub group_type: String,
    #[validate(length(
        min = 5,
        message = "Description / explanation does not contain enough detail"
    ))]
    pub description: String,
    /// Free-text pointer to the game that prompted the group.
    #[validate(length(max = 500))]
    pub game_reference: Option<String>,
    pub game_id: Option<GameId>,
    pub owner_country_id: Option<CountryId>,
}

/// Input for raising a suspicion from inside a game.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SuspicionInput {
    pub game_id: GameId,
    #[validate(length(min = 1, message = "At least one country must be suspected"))]
    pub suspected_country_ids: Vec<CountryId>,
    pub strength: i32,
    #[validate(length(
        min = 5,
        message = "Description / explanation does not contain enough detail"
    ))]
    pub explanation: String,
    /// Country of the reporting player, when they play in the game.
    pub reporting_country_id: Option<CountryId>,
}

/// A suspected player that was added to the new group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspectedMember {
    pub user_id: UserId,
    pub country_id: CountryId,
}

/// A suspected player that could not be added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspicionFailure {
    pub user_id: UserId,
    pub country_id: CountryId,
    pub reason: String,
}

/// Result of a suspicion raised from a game.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspicionOutcome {
    pub group: group::Model,
    pub added: Vec<SuspectedMember>,
    pub failures: Vec<SuspicionFailure>,
}

impl SuspicionOutcome {
    /// Whether every suspected player was added.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Service for managing relationship groups.
#[derive(Clone)]
pub struct GroupService {
    relationship_repo: RelationshipRepository,
    users: UserDirectoryService,
    games: GameDirectoryService,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub fn new(
        relationship_repo: RelationshipRepository,
        users: UserDirectoryService,
        games: GameDirectoryService,
    ) -> Self {
        Self {
            relationship_repo,
            users,
            games,
        }
    }

    /// Get a group by ID.
    pub async fn get_by_id(&self, id: GroupId) -> AppResult<group::Model> {
        self.relationship_repo.get_group(id).await
    }

    async fn require_game(&self, game_id: GameId) -> AppResult<GameInfo> {
        self.games
            .get_game(game_id)
            .await?
            .ok_or_else(|| AppError::Resolution(format!("Game {game_id} could not be found")))
    }

    async fn require_user(&self, user_id: UserId) -> AppResult<UserRecord> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Resolution(format!("User {user_id} could not be found")))
    }

    // ==================== Group Operations ====================

    /// Create a group.
    pub async fn create(&self, actor: &Actor, input: CreateGroupInput) -> AppResult<group::Model> {
        permission::require_create(actor)?;
        input.validate()?;

        let group_type: GroupType = input.group_type.parse()?;

        if group_type.is_suspicion() {
            let has_reference = input
                .game_reference
                .as_deref()
                .is_some_and(|r| r.trim().chars().count() >= MIN_GAME_REFERENCE_LEN);
            if input.game_id.is_none() && !has_reference && !actor.is_moderator() {
                return Err(AppError::Validation(
                    "A suspected relationship needs a reference to the game it came from"
                        .to_string(),
                ));
            }
        }

        if let Some(game_id) = input.game_id {
            let game = self.require_game(game_id).await?;
            if let Some(country_id) = input.owner_country_id {
                if game.country_name(country_id).is_none() {
                    return Err(AppError::Resolution(format!(
                        "Country {country_id} does not exist in game {game_id}"
                    )));
                }
            }
        } else if input.owner_country_id.is_some() {
            return Err(AppError::Validation(
                "A country can only be recorded for a group linked to a game".to_string(),
            ));
        }

        self.relationship_repo
            .create_group(NewGroup {
                group_type,
                name: input.name,
                description: input.description,
                game_reference: input.game_reference,
                owner_user_id: actor.id,
                game_id: input.game_id,
                owner_country_id: input.owner_country_id,
            })
            .await
    }

    /// Replace a group's description.
    pub async fn set_description(
        &self,
        actor: &Actor,
        group_id: GroupId,
        description: &str,
    ) -> AppResult<group::Model> {
        let group = self.relationship_repo.get_group(group_id).await?;
        permission::require_modify(&group, actor)?;

        self.relationship_repo
            .set_description(&group, description)
            .await
    }

    /// Append a moderator note, attributed to the acting moderator.
    pub async fn set_moderator_notes(
        &self,
        actor: &Actor,
        group_id: GroupId,
        note: &str,
    ) -> AppResult<group::Model> {
        permission::require_set_moderator_notes(actor)?;
        if note.trim().is_empty() {
            return Err(AppError::Validation("Moderator note is empty".to_string()));
        }

        let group = self.relationship_repo.get_group(group_id).await?;
        let updated = self
            .relationship_repo
            .append_moderator_notes(&group, note, &actor.username)
            .await?;

        info!(group_id, moderator_id = actor.id, "Appended moderator notes");
        Ok(updated)
    }

    /// Activate or deactivate a group.
    pub async fn set_active(
        &self,
        actor: &Actor,
        group_id: GroupId,
        is_active: bool,
    ) -> AppResult<group::Model> {
        let group = self.relationship_repo.get_group(group_id).await?;
        permission::require_modify(&group, actor)?;

        self.relationship_repo.set_active(&group, is_active).await
    }

    // ==================== Membership Operations ====================

    /// Add a user to a group.
    ///
    /// The strength counts for every role the actor holds towards the new
    /// membership. Adding someone already in the group only refreshes the row.
    pub async fn add_member(
        &self,
        actor: &Actor,
        group_id: GroupId,
        subject_id: UserId,
        strength: i32,
        country_id: Option<CountryId>,
    ) -> AppResult<()> {
        let group = self.relationship_repo.get_group(group_id).await?;
        let subject = self.require_user(subject_id).await?;
        permission::require_add(&group, actor, subject.role)?;

        if country_id.is_some() && group.game_id.is_none() {
            return Err(AppError::Validation(
                "A country can only be recorded for a group linked to a game".to_string(),
            ));
        }

        self.relationship_repo
            .upsert_membership(&group, actor, subject.id, strength, country_id)
            .await
    }

    /// Set the subject's own weighting.
    pub async fn update_user_weighting(
        &self,
        actor: &Actor,
        group_id: GroupId,
        subject_id: UserId,
        weighting: i32,
    ) -> AppResult<bool> {
        // Non-subjects are refused before the row is looked up.
        if actor.id != subject_id {
            return Err(AppError::PermissionDenied(
                "Not allowed to update the user weighting".to_string(),
            ));
        }

        let member = self
            .relationship_repo
            .require_member(group_id, subject_id)
            .await?;
        permission::require_update_user_weighting(actor, &member)?;

        self.relationship_repo
            .update_user_weighting(&member, weighting)
            .await
    }

    /// Set the owner's weighting of a member.
    pub async fn update_owner_weighting(
        &self,
        actor: &Actor,
        group_id: GroupId,
        subject_id: UserId,
        weighting: i32,
    ) -> AppResult<bool> {
        let group = self.relationship_repo.get_group(group_id).await?;
        permission::require_update_owner_weighting(actor, &group)?;

        let member = self
            .relationship_repo
            .require_member(group_id, subject_id)
            .await?;
        self.relationship_repo
            .update_owner_weighting(&member, weighting)
            .await
    }

    /// Set the moderator weighting of a member.
    pub async fn update_mod_weighting(
        &self,
        actor: &Actor,
        group_id: GroupId,
        subject_id: UserId,
        weighting: i32,
    ) -> AppResult<bool> {
        permission::require_update_mod_weighting(actor)?;

        let member = self
            .relationship_repo
            .require_member(group_id, subject_id)
            .await?;
        self.relationship_repo
            .update_mod_weighting(&member, weighting, actor.id)
            .await
    }

    /// Activate or deactivate one membership.
    pub async fn set_membership_active(
        &self,
        actor: &Actor,
        group_id: GroupId,
        subject_id: UserId,
        is_active: bool,
    ) -> AppResult<()> {
        let group = self.relationship_repo.get_group(group_id).await?;
        permission::require_modify(&group, actor)?;

        self.relationship_repo
            .set_membership_active(group_id, subject_id, is_active)
            .await
    }

    // ==================== Suspicion From Game ====================

    /// Raise a suspicion of collusion between countries of a game.
    ///
    /// Every country must resolve to a seated, known user before the group
    /// is created. Once it exists, members are added one by one and
    /// individual failures are reported instead of undoing the others.
    pub async fn create_suspicion_from_game(
        &self,
        actor: &Actor,
        input: SuspicionInput,
    ) -> AppResult<SuspicionOutcome> {
        permission::require_create(actor)?;
        input.validate()?;

        let game = self.require_game(input.game_id).await?;

        if let Some(country_id) = input.reporting_country_id {
            if game.country_name(country_id).is_none() {
                return Err(AppError::Resolution(format!(
                    "Country {country_id} does not exist in game {}",
                    game.id
                )));
            }
        }

        let mut seen = HashSet::new();
        let mut suspects = Vec::with_capacity(input.suspected_country_ids.len());
        for &country_id in &input.suspected_country_ids {
            if !seen.insert(country_id) {
                continue;
            }
            let user_id = self
                .users
                .seated_user(game.id, country_id)
                .await?
                .ok_or_else(|| {
                    AppError::Resolution(format!(
                        "Country {country_id} has no player in game {}",
                        game.id
                    ))
                })?;
            let user = self.require_user(user_id).await?;
            suspects.push((country_id, user));
        }

        let group = self
            .relationship_repo
            .create_group(NewGroup {
                group_type: GroupType::Unknown,
                name: format!("{} - #{}", game.name, game.turn),
                description: input.explanation,
                game_reference: Some(format!(
                    "{} (game {}, turn {}, {} {})",
                    game.name, game.id, game.turn, game.season, game.year
                )),
                owner_user_id: actor.id,
                game_id: Some(game.id),
                owner_country_id: input.reporting_country_id,
            })
            .await?;

        let mut added = Vec::with_capacity(suspects.len());
        let mut failures = Vec::new();
        for (country_id, user) in suspects {
            let result = match permission::require_add(&group, actor, user.role) {
                Ok(()) => {
                    self.relationship_repo
                        .upsert_membership(&group, actor, user.id, input.strength, Some(country_id))
                        .await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => added.push(SuspectedMember {
                    user_id: user.id,
                    country_id,
                }),
                Err(e) => {
                    warn!(
                        group_id = group.id,
                        user_id = user.id,
                        country_id,
                        error = %e,
                        "Failed to add suspected player"
                    );
                    failures.push(SuspicionFailure {
                        user_id: user.id,
                        country_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            group_id = group.id,
            game_id = game.id,
            reporter_id = actor.id,
            added = added.len(),
            failed = failures.len(),
            "Raised suspicion from game"
        );

        Ok(SuspicionOutcome {
            group,
            added,
            failures,
        })
    }

    // ==================== Read Models ====================

    /// Members of one group as the viewer may see them.
    pub async fn membership_table(
        &self,
        viewer: &Actor,
        group_id: GroupId,
    ) -> AppResult<MembershipTable> {
        let group = self.relationship_repo.get_group(group_id).await?;
        let rows = self
            .relationship_repo
            .load_members(MembershipFilter::ForGroup(group.clone()))
            .await?;
        permission::require_comment(&group, viewer, rows.iter().map(|(_, m)| m))?;

        let context = self.render_context(&rows).await?;
        Ok(render_membership_table(&rows, viewer, &context))
    }

    /// Every group a user belongs to, limited to what the viewer may see.
    ///
    /// The subject and moderators see every row. Anyone else only sees
    /// groups they own or are an active member of. Rows of anonymous games
    /// are dropped unless the viewer may see who the subject is.
    pub async fn relationship_history(
        &self,
        viewer: &Actor,
        subject_id: UserId,
    ) -> AppResult<MembershipTable> {
        let mut rows = self
            .relationship_repo
            .load_members(MembershipFilter::ForUser(subject_id))
            .await?;

        if viewer.id != subject_id && !viewer.is_moderator() {
            let own = self
                .relationship_repo
                .load_members(MembershipFilter::ForUser(viewer.id))
                .await?;
            rows.retain(|group, _| {
                permission::can_comment(group, viewer, own.iter().map(|(_, m)| m))
            });
        }

        let context = self.render_context(&rows).await?;
        rows.retain(|group, member| identity_visible(viewer, member.user_id, group, &context));

        Ok(render_membership_table(&rows, viewer, &context))
    }

    /// Fetch the games and usernames a set of rows refers to.
    async fn render_context(&self, rows: &MembershipSet) -> AppResult<RenderContext> {
        let mut user_ids = HashSet::new();
        for (group, member) in rows.iter() {
            user_ids.insert(member.user_id);
            user_ids.insert(group.owner_user_id);
            if let Some(mod_user_id) = member.mod_user_id {
                user_ids.insert(mod_user_id);
            }
        }

        let mut games = HashMap::new();
        for game_id in rows.groups().iter().filter_map(|g| g.game_id) {
            if games.contains_key(&game_id) {
                continue;
            }
            if let Some(game) = self.games.get_game(game_id).await? {
                games.insert(game_id, game);
            }
        }

        let mut usernames = HashMap::with_capacity(user_ids.len());
        for user_id in user_ids {
            if let Some(user) = self.users.get_user(user_id).await? {
                usernames.insert(user_id, user.username);
            }
        }

        Ok(RenderContext { games, usernames })
    }

    // ==================== Listings ====================

    /// Groups a user owns.
    pub async fn owned_groups(&self, user_id: UserId, active_only: bool) -> AppResult<Vec<GroupLabel>> {
        self.relationship_repo
            .owned_group_labels(user_id, active_only)
            .await
    }

    /// Declared relationships a user stands behind.
    pub async fn declared_groups(
        &self,
        user_id: UserId,
        active_only: bool,
    ) -> AppResult<Vec<GroupLabel>> {
        self.relationship_repo
            .declared_group_labels(user_id, active_only)
            .await
    }

    /// Suspicions a user has raised.
    pub async fn suspected_groups(
        &self,
        user_id: UserId,
        active_only: bool,
    ) -> AppResult<Vec<GroupLabel>> {
        self.relationship_repo
            .suspected_group_labels(user_id, active_only)
            .await
    }

    /// Every group a user is positively weighted in.
    pub async fn valid_groups(&self, user_id: UserId, active_only: bool) -> AppResult<Vec<GroupLabel>> {
        self.relationship_repo
            .valid_group_labels(user_id, active_only)
            .await
    }
}
