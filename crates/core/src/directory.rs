//! User and game directories.
//!
//! Accounts and games live in the surrounding game service. These traits let
//! the group service look them up without depending on that service.

use std::sync::Arc;

use async_trait::async_trait;
use liaison_common::{AccountRole, AppResult, CountryId, GameId, UserId};
use serde::Serialize;

/// An account as the group service needs to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub role: AccountRole,
}

/// One country of a game and the user currently playing it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountrySeat {
    pub country_id: CountryId,
    pub name: String,
    pub user_id: Option<UserId>,
}

/// Game state relevant to relationship tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub id: GameId,
    pub name: String,
    /// Players are only known by their country to other participants.
    pub anonymous: bool,
    pub turn: i32,
    pub phase: String,
    pub season: String,
    pub year: i32,
    pub countries: Vec<CountrySeat>,
}

impl GameInfo {
    /// Country the user is seated at, if they play in this game.
    #[must_use]
    pub fn country_of_user(&self, user_id: UserId) -> Option<CountryId> {
        self.countries
            .iter()
            .find(|seat| seat.user_id == Some(user_id))
            .map(|seat| seat.country_id)
    }

    /// User currently seated at a country.
    #[must_use]
    pub fn user_of_country(&self, country_id: CountryId) -> Option<UserId> {
        self.countries
            .iter()
            .find(|seat| seat.country_id == country_id)
            .and_then(|seat| seat.user_id)
    }

    /// Display name of a country.
    #[must_use]
    pub fn country_name(&self, country_id: CountryId) -> Option<&str> {
        self.countries
            .iter()
            .find(|seat| seat.country_id == country_id)
            .map(|seat| seat.name.as_str())
    }

    /// Whether a user takes part in this game.
    #[must_use]
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.country_of_user(user_id).is_some()
    }
}

/// Account lookups.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up an account by id.
    async fn get_user(&self, id: UserId) -> AppResult<Option<UserRecord>>;

    /// The user currently seated at a country of a game.
    async fn seated_user(&self, game_id: GameId, country_id: CountryId)
    -> AppResult<Option<UserId>>;
}

/// Game lookups.
#[async_trait]
pub trait GameDirectory: Send + Sync {
    /// Look up a game by id.
    async fn get_game(&self, id: GameId) -> AppResult<Option<GameInfo>>;
}

/// Type alias for a shared user directory.
pub type UserDirectoryService = Arc<dyn UserDirectory>;

/// Type alias for a shared game directory.
pub type GameDirectoryService = Arc<dyn GameDirectory>;
