//! Common utilities and shared types for liaison.
//!
//! This crate provides foundational components used across all liaison crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Identifiers**: Numeric id aliases shared by the store and the directories
//! - **Actors**: The acting account and its closed set of roles via [`Actor`]
//! - **Weighting**: Clamping and bucketing of relationship strengths via [`Bucket`]
//!
//! # Example
//!
//! ```
//! use liaison_common::weighting::{self, Bucket};
//!
//! let stored = weighting::normalize(140);
//! assert_eq!(stored, 100);
//! assert_eq!(weighting::bucket(stored), Bucket::Strong);
//! ```

pub mod actor;
pub mod config;
pub mod error;
pub mod id;
pub mod weighting;

pub use actor::{AccountRole, Actor};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::{CountryId, GameId, GroupId, UserId};
pub use weighting::Bucket;
