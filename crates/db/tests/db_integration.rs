//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `liaison_test`)
//!   `TEST_DB_PASSWORD` (default: `liaison_test`)
//!   `TEST_DB_NAME` (default: `liaison_test`)
//!
//! Each test works on its own owner and subject ids so the tests can share
//! one database without truncating each other's rows.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use liaison_common::{AccountRole, Actor, AppError};
use liaison_db::entities::group::GroupType;
use liaison_db::repositories::{MembershipFilter, NewGroup, RelationshipRepository};
use liaison_db::test_utils::{TestDatabase, TestDbConfig};

async fn repository() -> RelationshipRepository {
    let db = TestDatabase::new().await.expect("Failed to connect");
    RelationshipRepository::new(Arc::new(db.conn))
}

fn new_group(owner_user_id: i64, description: &str) -> NewGroup {
    NewGroup {
        group_type: GroupType::Person,
        name: "Flatmates".to_string(),
        description: description.to_string(),
        game_reference: None,
        owner_user_id,
        game_id: None,
        owner_country_id: None,
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let result = TestDatabase::with_config(TestDbConfig::default()).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_description_length_boundary() {
    let repo = repository().await;

    let short = repo.create_group(new_group(9001, "abcd")).await;
    assert!(matches!(short, Err(AppError::Validation(_))));

    let group = repo.create_group(new_group(9001, "abcde")).await.unwrap();
    assert!(group.id > 0);
    assert!(group.is_active);
    assert_eq!(group.description, "abcde");
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_upsert_is_idempotent_and_keeps_weightings() {
    let repo = repository().await;
    let owner = Actor::new(9002, "owner", AccountRole::User);
    let group = repo
        .create_group(new_group(owner.id, "lives next door"))
        .await
        .unwrap();

    repo.upsert_membership(&group, &owner, 9102, 80, None)
        .await
        .unwrap();
    let first = repo.require_member(group.id, 9102).await.unwrap();
    assert_eq!(first.owner_weighting, 80);
    assert_eq!(first.user_weighting, 0);

    // A second add with another strength only refreshes the timestamp.
    repo.upsert_membership(&group, &owner, 9102, 20, None)
        .await
        .unwrap();
    let second = repo.require_member(group.id, 9102).await.unwrap();
    assert_eq!(second.owner_weighting, 80);
    assert!(second.changed_at >= first.changed_at);
    assert_eq!(second.created_at, first.created_at);

    let set = repo
        .load_members(MembershipFilter::ForGroup(group))
        .await
        .unwrap();
    assert_eq!(set.len(), 1);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_weighting_updates_clamp_and_skip_noops() {
    let repo = repository().await;
    let owner = Actor::new(9003, "owner", AccountRole::User);
    let group = repo
        .create_group(new_group(owner.id, "same school"))
        .await
        .unwrap();
    repo.upsert_membership(&group, &owner, 9103, 66, None)
        .await
        .unwrap();

    let member = repo.require_member(group.id, 9103).await.unwrap();
    assert!(!repo.update_owner_weighting(&member, 66).await.unwrap());
    assert!(repo.update_user_weighting(&member, 250).await.unwrap());

    let member = repo.require_member(group.id, 9103).await.unwrap();
    assert_eq!(member.user_weighting, 100);

    assert!(repo.update_mod_weighting(&member, 33, 1).await.unwrap());
    let member = repo.require_member(group.id, 9103).await.unwrap();
    assert_eq!(member.mod_weighting, 33);
    assert_eq!(member.mod_user_id, Some(1));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_label_listings() {
    let repo = repository().await;
    // Listings count every group of the owner, so each run needs an unused one.
    let owner_id = 1_000_000 + i64::from(Utc::now().timestamp_subsec_micros());
    let owner = Actor::new(owner_id, "owner", AccountRole::User);
    let group = repo
        .create_group(new_group(owner.id, "plays in the same club"))
        .await
        .unwrap();
    repo.upsert_membership(&group, &owner, owner.id, 100, None)
        .await
        .unwrap();

    let owned = repo.owned_group_labels(owner.id, true).await.unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].label, format!("#{} Flatmates - Person", group.id));

    let declared = repo.declared_group_labels(owner.id, true).await.unwrap();
    assert_eq!(declared.len(), 1);

    let inactive = repo.set_active(&group, false).await.unwrap();
    assert!(!inactive.is_active);
    assert!(repo.owned_group_labels(owner.id, true).await.unwrap().is_empty());
    assert_eq!(repo.owned_group_labels(owner.id, false).await.unwrap().len(), 1);
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
