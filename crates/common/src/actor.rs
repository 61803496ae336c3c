//! The account performing an operation.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Standing of an account on the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountRole {
    /// Not a registered account (system or anonymous caller).
    Guest,
    /// Registered but banned; keeps no user standing.
    Banned,
    /// Ordinary registered account.
    User,
    /// Site moderator. Moderators are also users.
    Moderator,
}

impl AccountRole {
    /// Whether the role carries ordinary user standing.
    #[must_use]
    pub const fn has_user_standing(self) -> bool {
        match self {
            Self::User | Self::Moderator => true,
            Self::Guest | Self::Banned => false,
        }
    }

    /// Whether the role is a moderator.
    #[must_use]
    pub const fn is_moderator(self) -> bool {
        matches!(self, Self::Moderator)
    }
}

/// An explicitly passed acting identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Account id.
    pub id: UserId,
    /// Display name, used to attribute moderator notes.
    pub username: String,
    /// Standing of the account.
    pub role: AccountRole,
}

impl Actor {
    /// Create a new actor.
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>, role: AccountRole) -> Self {
        Self {
            id,
            username: username.into(),
            role,
        }
    }

    /// Whether this actor is a moderator.
    #[must_use]
    pub const fn is_moderator(&self) -> bool {
        self.role.is_moderator()
    }

    /// Whether this actor holds ordinary user standing.
    #[must_use]
    pub const fn has_user_standing(&self) -> bool {
        self.role.has_user_standing()
    }
}
