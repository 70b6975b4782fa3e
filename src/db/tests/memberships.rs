//! Shared tests for MembershipRepo implementations

use uuid::Uuid;

use super::harness::TestRepos;
use crate::{db::error::DbError, models::CreateUser};

pub async fn test_add_membership(repos: &TestRepos) {
    let user = repos.create_test_user("alice").await;
    let group = repos.create_test_group("Admins").await;

    repos
        .memberships
        .add(user, group)
        .await
        .expect("Failed to add membership");

    let all = repos.memberships.list_all().await.expect("List failed");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].user_id, user);
    assert_eq!(all[0].group_id, group);
    assert_eq!(all[0].group_display, "Admins");
    assert_eq!(all[0].user_display, "Test alice");
}

pub async fn test_add_membership_twice_is_idempotent(repos: &TestRepos) {
    let user = repos.create_test_user("alice").await;
    let group = repos.create_test_group("Admins").await;

    repos.memberships.add(user, group).await.expect("First add failed");
    repos.memberships.add(user, group).await.expect("Second add failed");

    let members = repos
        .memberships
        .list_for_group(group)
        .await
        .expect("List failed");
    assert_eq!(members.len(), 1);
}

pub async fn test_add_membership_missing_user(repos: &TestRepos) {
    let group = repos.create_test_group("Admins").await;

    let result = repos.memberships.add(Uuid::new_v4(), group).await;
    assert!(matches!(result, Err(DbError::MissingReference(_))));

    let all = repos.memberships.list_all().await.expect("List failed");
    assert!(all.is_empty());
}

pub async fn test_add_membership_missing_group(repos: &TestRepos) {
    let user = repos.create_test_user("alice").await;

    let result = repos.memberships.add(user, Uuid::new_v4()).await;
    assert!(matches!(result, Err(DbError::MissingReference(_))));
}

pub async fn test_remove_membership(repos: &TestRepos) {
    let user = repos.create_test_user("alice").await;
    let g1 = repos.create_test_group("One").await;
    let g2 = repos.create_test_group("Two").await;
    repos.memberships.add(user, g1).await.expect("Add failed");
    repos.memberships.add(user, g2).await.expect("Add failed");

    repos
        .memberships
        .remove(user, g1)
        .await
        .expect("Failed to remove membership");

    let memberships = repos
        .memberships
        .list_for_user(user)
        .await
        .expect("List failed");
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].group_id, g2);
}

pub async fn test_remove_absent_membership_is_ok(repos: &TestRepos) {
    let user = repos.create_test_user("alice").await;
    let group = repos.create_test_group("Admins").await;

    repos
        .memberships
        .remove(user, group)
        .await
        .expect("Removing an absent membership should succeed");
    repos
        .memberships
        .remove(Uuid::new_v4(), Uuid::new_v4())
        .await
        .expect("Removing unknown ids should succeed");
}

pub async fn test_list_all_in_insertion_order(repos: &TestRepos) {
    let alice = repos.create_test_user("alice").await;
    let bob = repos.create_test_user("bob").await;
    let g1 = repos.create_test_group("One").await;
    let g2 = repos.create_test_group("Two").await;

    repos.memberships.add(bob, g2).await.expect("Add failed");
    repos.memberships.add(alice, g1).await.expect("Add failed");
    repos.memberships.add(alice, g2).await.expect("Add failed");

    let all = repos.memberships.list_all().await.expect("List failed");
    let pairs: Vec<(Uuid, Uuid)> = all.iter().map(|m| (m.user_id, m.group_id)).collect();
    assert_eq!(pairs, vec![(bob, g2), (alice, g1), (alice, g2)]);
}

pub async fn test_user_display_falls_back_to_user_name(repos: &TestRepos) {
    let user = repos
        .users
        .create(CreateUser {
            active: true,
            user_name: "noname".to_string(),
            ..Default::default()
        })
        .await
        .expect("Failed to create user")
        .id;
    let group = repos.create_test_group("Admins").await;
    repos.memberships.add(user, group).await.expect("Add failed");

    let members = repos
        .memberships
        .list_for_group(group)
        .await
        .expect("List failed");
    assert_eq!(members[0].user_display, "noname");
}

pub async fn test_group_display_tracks_rename(repos: &TestRepos) {
    use crate::models::{AttributeValue, GroupAttribute};

    let user = repos.create_test_user("alice").await;
    let group = repos.create_test_group("Before").await;
    repos.memberships.add(user, group).await.expect("Add failed");

    repos
        .groups
        .update_attribute(
            group,
            GroupAttribute::DisplayName,
            AttributeValue::Text(Some("After".to_string())),
        )
        .await
        .expect("Rename failed");

    let memberships = repos
        .memberships
        .list_for_user(user)
        .await
        .expect("List failed");
    assert_eq!(memberships[0].group_display, "After");
}

// ============================================================================
// SQLite Tests - Fast, in-memory
// ============================================================================

#[cfg(all(test, feature = "database-sqlite"))]
mod sqlite_tests {
    use crate::db::tests::harness::sqlite_repos;

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let repos = sqlite_repos().await;
                super::$name(&repos).await;
            }
        };
    }

    sqlite_test!(test_add_membership);
    sqlite_test!(test_add_membership_twice_is_idempotent);
    sqlite_test!(test_add_membership_missing_user);
    sqlite_test!(test_add_membership_missing_group);
    sqlite_test!(test_remove_membership);
    sqlite_test!(test_remove_absent_membership_is_ok);
    sqlite_test!(test_list_all_in_insertion_order);
    sqlite_test!(test_user_display_falls_back_to_user_name);
    sqlite_test!(test_group_display_tracks_rename);
}

// ============================================================================
// PostgreSQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(all(test, feature = "database-postgres"))]
mod postgres_tests {
    use crate::db::tests::harness::postgres::postgres_repos;

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let repos = postgres_repos().await;
                super::$name(&repos).await;
            }
        };
    }

    postgres_test!(test_add_membership);
    postgres_test!(test_add_membership_twice_is_idempotent);
    postgres_test!(test_add_membership_missing_user);
    postgres_test!(test_add_membership_missing_group);
    postgres_test!(test_remove_membership);
    postgres_test!(test_remove_absent_membership_is_ok);
    postgres_test!(test_list_all_in_insertion_order);
    postgres_test!(test_user_display_falls_back_to_user_name);
    postgres_test!(test_group_display_tracks_rename);
}
