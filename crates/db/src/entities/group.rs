//! Relationship group entity.

use liaison_common::AppError;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of relationship a group records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum GroupType {
    #[sea_orm(string_value = "Person")]
    Person,
    #[sea_orm(string_value = "Family")]
    Family,
    #[sea_orm(string_value = "School")]
    School,
    #[sea_orm(string_value = "Work")]
    Work,
    #[sea_orm(string_value = "Other")]
    Other,
    /// Suspected relationship, usually raised from inside a game.
    #[sea_orm(string_value = "Unknown")]
    Unknown,
}

impl GroupType {
    /// Name as stored and displayed.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Family => "Family",
            Self::School => "School",
            Self::Work => "Work",
            Self::Other => "Other",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether this is a suspicion group.
    #[must_use]
    pub const fn is_suspicion(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for GroupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GroupType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Person" => Ok(Self::Person),
            "Family" => Ok(Self::Family),
            "School" => Ok(Self::School),
            "Work" => Ok(Self::Work),
            "Other" => Ok(Self::Other),
            "Unknown" => Ok(Self::Unknown),
            _ => Err(AppError::Validation(
                "Group type provided is invalid".to_string(),
            )),
        }
    }
}

/// Relationship group - a named container of weighted memberships.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "relation_group")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Group name.
    pub name: String,

    /// Kind of relationship.
    pub group_type: GroupType,

    /// Groups are deactivated, never deleted.
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    /// Creator's explanation, followed by the game reference audit line.
    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Attributed notes appended by moderators.
    #[sea_orm(column_type = "Text", nullable)]
    pub moderator_notes: Option<String>,

    /// User who created the group.
    #[sea_orm(indexed)]
    pub owner_user_id: i64,

    /// Game the group was raised from, if any.
    #[sea_orm(indexed, nullable)]
    pub game_id: Option<i64>,

    /// The creator's country in that game.
    #[sea_orm(nullable)]
    pub owner_country_id: Option<i32>,

    pub created_at: DateTimeWithTimeZone,

    pub changed_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_member::Entity")]
    Members,
}

impl Related<super::group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;
    use std::str::FromStr;

    #[test]
    fn test_parse_valid_types() {
        for t in GroupType::iter() {
            assert_eq!(GroupType::from_str(t.as_str()).ok(), Some(t));
        }
    }

    #[test]
    fn test_parse_rejects_unknown_spelling() {
        assert!(matches!(
            GroupType::from_str("unknown"),
            Err(AppError::Validation(_))
        ));
        assert!(GroupType::from_str("Friends").is_err());
    }
}
