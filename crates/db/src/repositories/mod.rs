//! Repository layer.

mod relationship;

pub use relationship::{
    GroupArena, GroupLabel, InitialWeightings, MIN_DESCRIPTION_LEN, MembershipFilter,
    MembershipSet, NewGroup, RelationshipRepository, membership_upsert,
};
