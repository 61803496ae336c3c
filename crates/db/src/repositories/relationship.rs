//! Relationship group repository.
//!
//! Persistence for relationship groups and their weighted memberships.
//! The repository never checks permissions; callers do that first.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use liaison_common::{
    Actor, AppError, AppResult, CountryId, GameId, GroupId, UserId, weighting,
};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Insert, Order,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, prelude::DateTimeWithTimeZone,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::entities::group::GroupType;
use crate::entities::{Group, GroupMember, group, group_member};

/// Minimum description length, in characters.
pub const MIN_DESCRIPTION_LEN: usize = 5;

/// A group about to be created.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub group_type: GroupType,
    pub name: String,
    pub description: String,
    /// Free-text pointer to the game that prompted the group, kept for audit.
    pub game_reference: Option<String>,
    pub owner_user_id: UserId,
    pub game_id: Option<GameId>,
    pub owner_country_id: Option<CountryId>,
}

impl NewGroup {
    /// Description as persisted: the creator's text plus the game reference line.
    fn stored_description(&self) -> AppResult<String> {
        let description = self.description.trim();
        if description.chars().count() < MIN_DESCRIPTION_LEN {
            return Err(AppError::Validation(
                "Description / explanation does not contain enough detail, please enter a description / explanation."
                    .to_string(),
            ));
        }

        match self.game_reference.as_deref().map(str::trim) {
            Some(reference) if !reference.is_empty() => {
                Ok(format!("{description}\nGame reference: {reference}"))
            }
            _ => Ok(description.to_string()),
        }
    }
}

/// Weightings a new membership starts with, derived from who added it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InitialWeightings {
    pub user: i32,
    pub owner: i32,
    pub moderator: i32,
    pub mod_user_id: Option<UserId>,
}

impl InitialWeightings {
    /// Split one strength into the contributions the adder is entitled to make.
    ///
    /// The adder speaks for the subject only when adding themself, for the
    /// owner only when they own the group, and as moderator only when they
    /// are one. Every other contribution starts at zero.
    #[must_use]
    pub fn for_adder(adder: &Actor, subject_id: UserId, owner_id: UserId, strength: i32) -> Self {
        let strength = weighting::normalize(strength);
        let mut initial = Self::default();

        if adder.is_moderator() {
            initial.moderator = strength;
            initial.mod_user_id = Some(adder.id);
        }
        if adder.id == subject_id {
            initial.user = strength;
        }
        if adder.id == owner_id {
            initial.owner = strength;
        }

        initial
    }
}

/// Which memberships to load.
#[derive(Debug, Clone)]
pub enum MembershipFilter {
    /// Every membership of one group that is already loaded.
    ForGroup(group::Model),
    /// Every membership a user holds, across groups.
    ForUser(UserId),
    /// Every membership of the groups a user owns.
    OwnedBy(UserId),
    /// Any other cross-group condition on the membership table.
    Custom(Condition),
}

/// Groups loaded alongside memberships, stored once per id.
#[derive(Debug, Clone, Default)]
pub struct GroupArena {
    groups: Vec<group::Model>,
    index: HashMap<GroupId, usize>,
}

impl GroupArena {
    /// Insert a group, returning its slot. Re-inserting an id keeps the first copy.
    pub fn insert(&mut self, group: group::Model) -> usize {
        if let Some(&slot) = self.index.get(&group.id) {
            return slot;
        }
        let slot = self.groups.len();
        self.index.insert(group.id, slot);
        self.groups.push(group);
        slot
    }

    /// Slot of a group id, if loaded.
    #[must_use]
    pub fn slot(&self, id: GroupId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Look a group up by id.
    #[must_use]
    pub fn get(&self, id: GroupId) -> Option<&group::Model> {
        self.slot(id).map(|slot| &self.groups[slot])
    }

    /// Number of distinct groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no group is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All distinct groups in load order.
    pub fn iter(&self) -> impl Iterator<Item = &group::Model> {
        self.groups.iter()
    }
}

/// Memberships with their groups attached through a [`GroupArena`].
#[derive(Debug, Clone, Default)]
pub struct MembershipSet {
    groups: GroupArena,
    rows: Vec<(usize, group_member::Model)>,
}

impl MembershipSet {
    /// The distinct groups referenced by the rows.
    #[must_use]
    pub const fn groups(&self) -> &GroupArena {
        &self.groups
    }

    /// Number of membership rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows paired with their group.
    pub fn iter(&self) -> impl Iterator<Item = (&group::Model, &group_member::Model)> {
        self.rows
            .iter()
            .map(|(slot, member)| (&self.groups.groups[*slot], member))
    }

    /// Keep only the rows matching `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&group::Model, &group_member::Model) -> bool) {
        let groups = &self.groups.groups;
        self.rows.retain(|(slot, member)| keep(&groups[*slot], member));
    }

    fn attach(groups: GroupArena, members: Vec<group_member::Model>) -> Self {
        let mut rows = Vec::with_capacity(members.len());
        for member in members {
            match groups.slot(member.group_id) {
                Some(slot) => rows.push((slot, member)),
                None => warn!(
                    group_id = member.group_id,
                    user_id = member.user_id,
                    "Membership references a group that was not loaded; skipping"
                ),
            }
        }
        Self { groups, rows }
    }
}

/// A group id with its display label, for pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLabel {
    pub id: GroupId,
    pub label: String,
}

impl GroupLabel {
    fn with_type(group: &group::Model) -> Self {
        Self {
            id: group.id,
            label: format!("#{} {} - {}", group.id, group.name, group.group_type),
        }
    }

    fn without_type(group: &group::Model) -> Self {
        Self {
            id: group.id,
            label: format!("#{} {}", group.id, group.name),
        }
    }
}

/// Build the membership upsert: insert, or only bump `changed_at` on conflict.
#[must_use]
pub fn membership_upsert(model: group_member::ActiveModel) -> Insert<group_member::ActiveModel> {
    GroupMember::insert(model).on_conflict(
        OnConflict::columns([group_member::Column::GroupId, group_member::Column::UserId])
            .update_column(group_member::Column::ChangedAt)
            .to_owned(),
    )
}

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

/// Repository for relationship groups and memberships.
#[derive(Clone)]
pub struct RelationshipRepository {
    db: Arc<DatabaseConnection>,
}

impl RelationshipRepository {
    /// Create a new relationship repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get reference to the database connection.
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    // ==================== Group Operations ====================

    /// Find group by ID.
    pub async fn find_group(&self, id: GroupId) -> AppResult<Option<group::Model>> {
        Group::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get group by ID, returning error if not found.
    pub async fn get_group(&self, id: GroupId) -> AppResult<group::Model> {
        self.find_group(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group ID not found: {id}")))
    }

    /// Validate and insert a new active group.
    pub async fn create_group(&self, new: NewGroup) -> AppResult<group::Model> {
        let description = new.stored_description()?;
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Group name is required".to_string()));
        }

        let now = now();
        let model = group::ActiveModel {
            name: Set(name),
            group_type: Set(new.group_type),
            is_active: Set(true),
            description: Set(description),
            moderator_notes: Set(None),
            owner_user_id: Set(new.owner_user_id),
            game_id: Set(new.game_id),
            owner_country_id: Set(new.owner_country_id),
            created_at: Set(now),
            changed_at: Set(now),
            ..Default::default()
        };

        let group = model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            group_id = group.id,
            owner_user_id = group.owner_user_id,
            group_type = %group.group_type,
            game_id = ?group.game_id,
            "Created relationship group"
        );

        Ok(group)
    }

    /// Replace the group description.
    pub async fn set_description(
        &self,
        group: &group::Model,
        description: &str,
    ) -> AppResult<group::Model> {
        let description = description.trim();
        if description.chars().count() < MIN_DESCRIPTION_LEN {
            return Err(AppError::Validation(
                "Description does not contain enough detail".to_string(),
            ));
        }

        let mut active: group::ActiveModel = group.clone().into();
        active.description = Set(description.to_string());
        active.changed_at = Set(now());
        self.update_group(active).await
    }

    /// Append an attributed note to the moderator notes.
    pub async fn append_moderator_notes(
        &self,
        group: &group::Model,
        note: &str,
        moderator_username: &str,
    ) -> AppResult<group::Model> {
        let entry = format!("{}-{moderator_username}", note.trim());
        let notes = match group.moderator_notes.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{entry}"),
            _ => entry,
        };

        let mut active: group::ActiveModel = group.clone().into();
        active.moderator_notes = Set(Some(notes));
        active.changed_at = Set(now());
        self.update_group(active).await
    }

    /// Activate or deactivate a group.
    pub async fn set_active(&self, group: &group::Model, is_active: bool) -> AppResult<group::Model> {
        let mut active: group::ActiveModel = group.clone().into();
        active.is_active = Set(is_active);
        active.changed_at = Set(now());
        let updated = self.update_group(active).await?;

        info!(group_id = updated.id, is_active, "Updated group active flag");
        Ok(updated)
    }

    async fn update_group(&self, model: group::ActiveModel) -> AppResult<group::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Membership Operations ====================

    /// Get a single membership.
    pub async fn get_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> AppResult<Option<group_member::Model>> {
        GroupMember::find_by_id((group_id, user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a single membership, returning error if not found.
    pub async fn require_member(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> AppResult<group_member::Model> {
        self.get_member(group_id, user_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("User {user_id} is not a member of group {group_id}"))
        })
    }

    /// Add a user to a group, or refresh `changed_at` if they are already in it.
    ///
    /// Weightings are only written by the first insert.
    pub async fn upsert_membership(
        &self,
        group: &group::Model,
        adder: &Actor,
        subject_id: UserId,
        strength: i32,
        country_id: Option<CountryId>,
    ) -> AppResult<()> {
        let initial = InitialWeightings::for_adder(adder, subject_id, group.owner_user_id, strength);
        let now = now();

        let model = group_member::ActiveModel {
            group_id: Set(group.id),
            user_id: Set(subject_id),
            is_active: Set(true),
            user_weighting: Set(initial.user),
            owner_weighting: Set(initial.owner),
            mod_weighting: Set(initial.moderator),
            mod_user_id: Set(initial.mod_user_id),
            country_id: Set(country_id),
            created_at: Set(now),
            changed_at: Set(now),
        };

        membership_upsert(model)
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            group_id = group.id,
            user_id = subject_id,
            added_by = adder.id,
            country_id = ?country_id,
            "Upserted group membership"
        );

        Ok(())
    }

    /// Set the member's own weighting. Returns whether a write happened.
    pub async fn update_user_weighting(
        &self,
        member: &group_member::Model,
        new_weighting: i32,
    ) -> AppResult<bool> {
        let value = weighting::normalize(new_weighting);
        if member.user_weighting == value {
            debug!(group_id = member.group_id, user_id = member.user_id, "User weighting unchanged");
            return Ok(false);
        }
        self.write_weighting(member, group_member::Column::UserWeighting, value, None)
            .await
    }

    /// Set the owner's weighting. Returns whether a write happened.
    pub async fn update_owner_weighting(
        &self,
        member: &group_member::Model,
        new_weighting: i32,
    ) -> AppResult<bool> {
        let value = weighting::normalize(new_weighting);
        if member.owner_weighting == value {
            debug!(group_id = member.group_id, user_id = member.user_id, "Owner weighting unchanged");
            return Ok(false);
        }
        self.write_weighting(member, group_member::Column::OwnerWeighting, value, None)
            .await
    }

    /// Set the moderator weighting and record who set it. Returns whether a write happened.
    pub async fn update_mod_weighting(
        &self,
        member: &group_member::Model,
        new_weighting: i32,
        moderator_id: UserId,
    ) -> AppResult<bool> {
        let value = weighting::normalize(new_weighting);
        if member.mod_weighting == value {
            debug!(group_id = member.group_id, user_id = member.user_id, "Moderator weighting unchanged");
            return Ok(false);
        }
        self.write_weighting(
            member,
            group_member::Column::ModWeighting,
            value,
            Some(moderator_id),
        )
        .await
    }

    /// Single-row update of one weighting column plus `changed_at`.
    async fn write_weighting(
        &self,
        member: &group_member::Model,
        column: group_member::Column,
        value: i32,
        moderator_id: Option<UserId>,
    ) -> AppResult<bool> {
        let mut update = GroupMember::update_many()
            .col_expr(column, Expr::value(value))
            .col_expr(group_member::Column::ChangedAt, Expr::value(now()));
        if let Some(moderator_id) = moderator_id {
            update = update.col_expr(group_member::Column::ModUserId, Expr::value(moderator_id));
        }

        let result = update
            .filter(group_member::Column::GroupId.eq(member.group_id))
            .filter(group_member::Column::UserId.eq(member.user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "User {} is not a member of group {}",
                member.user_id, member.group_id
            )));
        }

        info!(
            group_id = member.group_id,
            user_id = member.user_id,
            column = ?column,
            value,
            "Updated membership weighting"
        );

        Ok(true)
    }

    /// Activate or deactivate a membership.
    pub async fn set_membership_active(
        &self,
        group_id: GroupId,
        user_id: UserId,
        is_active: bool,
    ) -> AppResult<()> {
        let result = GroupMember::update_many()
            .col_expr(group_member::Column::IsActive, Expr::value(is_active))
            .col_expr(group_member::Column::ChangedAt, Expr::value(now()))
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "User {user_id} is not a member of group {group_id}"
            )));
        }

        info!(group_id, user_id, is_active, "Updated membership active flag");
        Ok(())
    }

    /// Load memberships and attach their groups.
    ///
    /// For a known group this is a single query. Otherwise the rows are
    /// loaded first and their groups fetched in one follow-up query.
    pub async fn load_members(&self, filter: MembershipFilter) -> AppResult<MembershipSet> {
        let (condition, known_group) = match filter {
            MembershipFilter::ForGroup(group) => (
                Condition::all().add(group_member::Column::GroupId.eq(group.id)),
                Some(group),
            ),
            MembershipFilter::ForUser(user_id) => (
                Condition::all().add(group_member::Column::UserId.eq(user_id)),
                None,
            ),
            MembershipFilter::OwnedBy(owner_id) => (
                Condition::all().add(
                    group_member::Column::GroupId.in_subquery(
                        sea_orm::sea_query::Query::select()
                            .column(group::Column::Id)
                            .from(Group)
                            .and_where(group::Column::OwnerUserId.eq(owner_id))
                            .to_owned(),
                    ),
                ),
                None,
            ),
            MembershipFilter::Custom(condition) => (condition, None),
        };

        let members = GroupMember::find()
            .filter(condition)
            .order_by(group_member::Column::GroupId, Order::Desc)
            .order_by(group_member::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut arena = GroupArena::default();
        if let Some(group) = known_group {
            arena.insert(group);
        } else {
            let mut group_ids: Vec<GroupId> = members.iter().map(|m| m.group_id).collect();
            group_ids.sort_unstable();
            group_ids.dedup();

            if !group_ids.is_empty() {
                let groups = Group::find()
                    .filter(group::Column::Id.is_in(group_ids))
                    .all(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                for group in groups {
                    arena.insert(group);
                }
            }
        }

        Ok(MembershipSet::attach(arena, members))
    }

    // ==================== Label Listings ====================

    /// Groups a user owns, most recently changed first.
    pub async fn owned_group_labels(
        &self,
        user_id: UserId,
        active_only: bool,
    ) -> AppResult<Vec<GroupLabel>> {
        let mut query = Group::find().filter(group::Column::OwnerUserId.eq(user_id));
        if active_only {
            query = query.filter(group::Column::IsActive.eq(true));
        }

        let groups = query
            .order_by(group::Column::ChangedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(groups.iter().map(GroupLabel::with_type).collect())
    }

    /// Declared (non-suspicion) groups a user is in with a positive self or moderator weighting.
    pub async fn declared_group_labels(
        &self,
        user_id: UserId,
        active_only: bool,
    ) -> AppResult<Vec<GroupLabel>> {
        let groups = self
            .weighted_groups_of(user_id, active_only, true)
            .await?;
        Ok(groups.iter().map(GroupLabel::with_type).collect())
    }

    /// Suspicion groups a user has raised, newest first.
    pub async fn suspected_group_labels(
        &self,
        user_id: UserId,
        active_only: bool,
    ) -> AppResult<Vec<GroupLabel>> {
        let mut query = Group::find()
            .filter(group::Column::OwnerUserId.eq(user_id))
            .filter(group::Column::GroupType.eq(GroupType::Unknown));
        if active_only {
            query = query.filter(group::Column::IsActive.eq(true));
        }

        let groups = query
            .order_by(group::Column::Id, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(groups.iter().map(GroupLabel::without_type).collect())
    }

    /// Any group a user is in with a positive self or moderator weighting.
    pub async fn valid_group_labels(
        &self,
        user_id: UserId,
        active_only: bool,
    ) -> AppResult<Vec<GroupLabel>> {
        let groups = self
            .weighted_groups_of(user_id, active_only, false)
            .await?;
        Ok(groups.iter().map(GroupLabel::with_type).collect())
    }

    async fn weighted_groups_of(
        &self,
        user_id: UserId,
        active_only: bool,
        exclude_suspicions: bool,
    ) -> AppResult<Vec<group::Model>> {
        let mut query = Group::find()
            .join(sea_orm::JoinType::InnerJoin, group::Relation::Members.def())
            .filter(group_member::Column::UserId.eq(user_id))
            .filter(
                Condition::any()
                    .add(group_member::Column::ModWeighting.gt(0))
                    .add(group_member::Column::UserWeighting.gt(0)),
            );
        if active_only {
            query = query
                .filter(group::Column::IsActive.eq(true))
                .filter(group_member::Column::IsActive.eq(true));
        }
        if exclude_suspicions {
            query = query.filter(group::Column::GroupType.ne(GroupType::Unknown));
        }

        query
            .order_by(group::Column::ChangedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
