//! Database entities.

pub mod group;
pub mod group_member;

pub use group::Entity as Group;
pub use group_member::Entity as GroupMember;
