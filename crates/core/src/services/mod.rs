//! Business logic services.

pub mod group;

pub use group::{
    CreateGroupInput, GroupService, SuspectedMember, SuspicionFailure, SuspicionInput,
    SuspicionOutcome,
};
