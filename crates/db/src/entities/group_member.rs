//! Relationship group membership entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One user's weighted membership of a group, keyed by (group, user).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "relation_group_member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: i64,

    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    /// Memberships are deactivated, never deleted.
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    /// Weighting asserted by the member themself.
    #[sea_orm(default_value = 0)]
    pub user_weighting: i32,

    /// Weighting asserted by the group owner.
    #[sea_orm(default_value = 0)]
    pub owner_weighting: i32,

    /// Weighting asserted by a moderator.
    #[sea_orm(default_value = 0)]
    pub mod_weighting: i32,

    /// Moderator who last set `mod_weighting`.
    #[sea_orm(nullable)]
    pub mod_user_id: Option<i64>,

    /// Suspected country, for game scoped groups.
    #[sea_orm(nullable)]
    pub country_id: Option<i32>,

    pub created_at: DateTimeWithTimeZone,

    pub changed_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
