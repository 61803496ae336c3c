//! Identifier types.
//!
//! Groups are numbered by the store. Users, games and countries are owned by
//! the surrounding game service and only referenced here.

/// Relationship group id, assigned by the store.
pub type GroupId = i64;

/// User account id.
pub type UserId = i64;

/// Game id.
pub type GameId = i64;

/// In-game country id, unique within one game's variant.
pub type CountryId = i32;
