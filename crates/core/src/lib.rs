//! Core business logic for liaison.
//!
//! Permission checks, identity visibility and the [`GroupService`] that ties
//! them to the relationship repository.

pub mod directory;
pub mod permission;
pub mod services;
pub mod visibility;

pub use directory::{
    CountrySeat, GameDirectory, GameDirectoryService, GameInfo, UserDirectory,
    UserDirectoryService, UserRecord,
};
pub use services::*;
