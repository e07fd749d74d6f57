//! User actor behavior against mock collaborators.

use actor_runtime::{ActorClient, ActorState};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use user_management::clients::UserManagementClient;
use user_management::config::UserManagementOptions;
use user_management::gateways::{ProviderError, PublishError, StoreError};
use user_management::mock::MockCollaborators;
use user_management::model::{EventPayload, UserRecord, UserStatus};
use user_management::outcome::{ErrorCode, ErrorInfo};
use user_management::user_actor::{self, UserError};

fn roles(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Mocks seeded with user 1 (`ext-1`, active, [player]) and a client over them.
fn setup_with(options: UserManagementOptions) -> (MockCollaborators, UserManagementClient) {
    let mocks = MockCollaborators::new();
    mocks
        .store
        .insert(UserRecord::new(1, "ext-1").with_roles(["player"]));
    let client = user_actor::new(mocks.context(options));
    (mocks, client)
}

fn setup() -> (MockCollaborators, UserManagementClient) {
    setup_with(UserManagementOptions::default())
}

// =============================================================================
// GetUser
// =============================================================================

#[tokio::test]
async fn test_get_user_loads_once_per_activation() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();

    let first = users.get_user(1, &cancel).await.expect("Failed to get user");
    let second = users.get_user(1, &cancel).await.expect("Failed to get user");

    assert_eq!(first, second);
    assert_eq!(first.roles, roles(&["player"]));
    assert_eq!(mocks.journal.count("store.get_user"), 1);
    assert!(mocks.events.published().is_empty());
    assert_eq!(mocks.journal.count("identity.set_claims"), 0);
}

#[tokio::test]
async fn test_get_user_missing_is_not_found() {
    let (_mocks, users) = setup();
    let cancel = CancellationToken::new();

    let result = users.get_user(99, &cancel).await;
    assert_eq!(result, Err(UserError::NotFound(99)));
}

#[tokio::test]
async fn test_get_user_store_failure_surfaces_unchanged() {
    let (mocks, users) = setup();
    mocks
        .store
        .faults()
        .fail_next(StoreError::Backend("connection reset".into()));
    let cancel = CancellationToken::new();

    let err = users.get_user(1, &cancel).await.unwrap_err();
    assert_eq!(err, UserError::PersistenceError("connection reset".into()));

    // Nothing was cached, so the next call reads the store again.
    users.get_user(1, &cancel).await.expect("Failed to get user");
    assert_eq!(mocks.journal.count("store.get_user"), 2);
}

// =============================================================================
// SetStatus
// =============================================================================

#[tokio::test]
async fn test_set_status_commits_syncs_and_publishes() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();

    users
        .set_status(1, UserStatus::Banned, &cancel)
        .await
        .expect("Failed to set status");

    assert_eq!(mocks.store.get(1).unwrap().status, UserStatus::Banned);
    assert_eq!(
        mocks.journal.calls(),
        vec![
            "store.get_user(1)",
            "store.set_status(1)",
            "identity.set_claims(1)",
            "events.publish(1)",
        ]
    );

    let claims = mocks.identity.claims_for("ext-1").expect("Claims not synced");
    assert_eq!(claims["status"], json!("banned"));
    assert_eq!(claims["roles"], json!(["player"]));

    let events = mocks.events.published();
    assert_eq!(events.len(), 1);
    match &events[0].payload {
        EventPayload::StatusChanged(event) => {
            assert_eq!(event.previous_status, UserStatus::Active);
            assert_eq!(event.new_status, UserStatus::Banned);
            assert_eq!(event.changed_by, "system");
        }
        other => panic!("Unexpected event: {other:?}"),
    }

    // The cache was advanced in place; no second load.
    let user = users.get_user(1, &cancel).await.unwrap();
    assert_eq!(user.status, UserStatus::Banned);
    assert_eq!(mocks.journal.count("store.get_user"), 1);
}

#[tokio::test]
async fn test_set_status_to_current_is_duplicate_without_calls() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    users.get_user(1, &cancel).await.unwrap();
    mocks.journal.clear();

    let result = users.set_status(1, UserStatus::Active, &cancel).await;

    assert!(matches!(result, Err(UserError::Duplicate(_))));
    assert_eq!(ErrorInfo::from(&result).error_code(), ErrorCode::Duplicate);
    assert!(mocks.journal.calls().is_empty());
}

#[tokio::test]
async fn test_repeated_ban_publishes_one_event() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();

    users.set_status(1, UserStatus::Banned, &cancel).await.unwrap();
    let repeat = users.set_status(1, UserStatus::Banned, &cancel).await;

    assert!(matches!(repeat, Err(UserError::Duplicate(_))));
    assert_eq!(mocks.events.published_for(1).len(), 1);
    assert_eq!(mocks.journal.count("store.set_status"), 1);
}

#[tokio::test]
async fn test_set_status_zero_rows_is_not_found_and_keeps_cache() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    users.get_user(1, &cancel).await.unwrap();

    // Deleted underneath the warm activation.
    mocks.store.remove(1);

    let result = users.set_status(1, UserStatus::Banned, &cancel).await;
    assert_eq!(result, Err(UserError::NotFound(1)));

    let cached = users.get_user(1, &cancel).await.unwrap();
    assert_eq!(cached.status, UserStatus::Active);
    assert!(mocks.events.published().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_leaves_cache_unchanged() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    users.get_user(1, &cancel).await.unwrap();
    mocks
        .store
        .faults()
        .fail_next(StoreError::Backend("deadlock".into()));

    let err = users
        .set_status(1, UserStatus::Banned, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::PersistenceError);
    assert_eq!(
        users.get_user(1, &cancel).await.unwrap().status,
        UserStatus::Active
    );
    assert_eq!(mocks.journal.count("identity.set_claims"), 0);
    assert!(mocks.events.published().is_empty());
}

#[tokio::test]
async fn test_provider_failure_surfaces_after_commit() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    mocks
        .identity
        .faults()
        .fail_next(ProviderError::Unavailable("503".into()));

    let err = users
        .set_status(1, UserStatus::ShadowBanned, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ProviderError);
    // The write landed and the cache followed it.
    assert_eq!(mocks.store.get(1).unwrap().status, UserStatus::ShadowBanned);
    assert_eq!(
        users.get_user(1, &cancel).await.unwrap().status,
        UserStatus::ShadowBanned
    );
    // The pipeline stopped before publishing.
    assert!(mocks.events.published().is_empty());
}

#[tokio::test]
async fn test_publish_failure_is_swallowed() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    mocks
        .events
        .faults()
        .fail_always(PublishError::Unavailable("bus down".into()));

    let result = users.set_status(1, UserStatus::Banned, &cancel).await;

    assert_eq!(result, Ok(()));
    assert_eq!(mocks.store.get(1).unwrap().status, UserStatus::Banned);
    assert_eq!(mocks.journal.count("events.publish"), 1);
}

#[tokio::test]
async fn test_disabled_provider_sync_skips_claims() {
    let options = UserManagementOptions {
        disable_provider_sync: true,
        ..Default::default()
    };
    let (mocks, users) = setup_with(options);
    let cancel = CancellationToken::new();

    users.set_status(1, UserStatus::Banned, &cancel).await.unwrap();

    assert_eq!(mocks.journal.count("identity.set_claims"), 0);
    assert!(mocks.identity.claims_for("ext-1").is_none());
    assert_eq!(mocks.events.published().len(), 1);
}

#[tokio::test]
async fn test_changed_by_comes_from_options() {
    let options = UserManagementOptions {
        changed_by: "moderation-bot".to_string(),
        ..Default::default()
    };
    let (mocks, users) = setup_with(options);
    let cancel = CancellationToken::new();

    users.set_status(1, UserStatus::Banned, &cancel).await.unwrap();

    match &mocks.events.published()[0].payload {
        EventPayload::StatusChanged(event) => assert_eq!(event.changed_by, "moderation-bot"),
        other => panic!("Unexpected event: {other:?}"),
    }
}

// =============================================================================
// UpdateRoles
// =============================================================================

#[tokio::test]
async fn test_update_roles_deduplicates_and_skips_held_roles() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();

    let change = users
        .update_roles(1, strings(&["admin", "admin", "player"]), vec![], &cancel)
        .await
        .expect("Failed to update roles");

    assert_eq!(change.added, roles(&["admin"]));
    assert!(change.removed.is_empty());
    assert_eq!(mocks.store.get(1).unwrap().roles, roles(&["admin", "player"]));
    assert_eq!(
        users.get_user(1, &cancel).await.unwrap().roles,
        roles(&["admin", "player"])
    );

    let claims = mocks.identity.claims_for("ext-1").unwrap();
    assert_eq!(claims["roles"], json!(["admin", "player"]));

    match &mocks.events.published()[0].payload {
        EventPayload::RolesUpdated(event) => {
            assert_eq!(event.added_roles, roles(&["admin"]));
            assert!(event.removed_roles.is_empty());
            assert_eq!(event.roles, roles(&["admin", "player"]));
        }
        other => panic!("Unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_update_roles_adds_and_removes_in_one_write() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();

    let change = users
        .update_roles(1, strings(&["moderator"]), strings(&["player", "ghost"]), &cancel)
        .await
        .unwrap();

    assert_eq!(change.added, roles(&["moderator"]));
    assert_eq!(change.removed, roles(&["player"]));
    assert_eq!(mocks.journal.count("store.update_roles"), 1);
    assert_eq!(mocks.store.get(1).unwrap().roles, roles(&["moderator"]));
}

#[tokio::test]
async fn test_role_named_in_both_lists_is_duplicate_without_side_effects() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();

    let result = users
        .update_roles(1, strings(&["x"]), strings(&["x"]), &cancel)
        .await;

    assert!(matches!(result, Err(UserError::Duplicate(_))));
    assert_eq!(mocks.journal.count("store.update_roles"), 0);
    assert_eq!(mocks.journal.count("identity.set_claims"), 0);
    assert!(mocks.events.published().is_empty());
    assert_eq!(mocks.store.get(1).unwrap().roles, roles(&["player"]));
}

#[tokio::test]
async fn test_update_roles_rejects_blank_names() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();

    let err = users
        .update_roles(1, strings(&["  "]), vec![], &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert_eq!(mocks.journal.count("store.update_roles"), 0);
}

#[tokio::test]
async fn test_update_roles_zero_rows_is_not_found_and_keeps_cache() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    users.get_user(1, &cancel).await.unwrap();

    // Deleted underneath the warm activation.
    mocks.store.remove(1);

    let result = users
        .update_roles(1, strings(&["admin"]), vec![], &cancel)
        .await;
    assert_eq!(result, Err(UserError::NotFound(1)));

    let cached = users.get_user(1, &cancel).await.unwrap();
    assert_eq!(cached.roles, roles(&["player"]));
    assert_eq!(mocks.journal.count("identity.set_claims"), 0);
    assert!(mocks.events.published().is_empty());
}

#[tokio::test]
async fn test_update_roles_persistence_failure_leaves_cache_unchanged() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    users.get_user(1, &cancel).await.unwrap();
    mocks
        .store
        .faults()
        .fail_next(StoreError::Backend("deadlock".into()));

    let err = users
        .update_roles(1, strings(&["admin"]), vec![], &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::PersistenceError);
    assert_eq!(
        users.get_user(1, &cancel).await.unwrap().roles,
        roles(&["player"])
    );
    assert_eq!(mocks.store.get(1).unwrap().roles, roles(&["player"]));
    assert_eq!(mocks.journal.count("identity.set_claims"), 0);
    assert!(mocks.events.published().is_empty());
}

#[tokio::test]
async fn test_update_roles_provider_failure_surfaces_after_commit() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    mocks
        .identity
        .faults()
        .fail_next(ProviderError::Unavailable("503".into()));

    let err = users
        .update_roles(1, strings(&["admin"]), vec![], &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ProviderError);
    assert_eq!(mocks.store.get(1).unwrap().roles, roles(&["admin", "player"]));
    assert_eq!(
        users.get_user(1, &cancel).await.unwrap().roles,
        roles(&["admin", "player"])
    );
    assert!(mocks.events.published().is_empty());
}

#[tokio::test]
async fn test_update_roles_publish_failure_is_swallowed() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    mocks
        .events
        .faults()
        .fail_always(PublishError::Unavailable("bus down".into()));

    let change = users
        .update_roles(1, strings(&["admin"]), vec![], &cancel)
        .await
        .expect("Publish failure must not fail the update");

    assert_eq!(change.added, roles(&["admin"]));
    assert_eq!(mocks.store.get(1).unwrap().roles, roles(&["admin", "player"]));
    assert!(mocks.identity.claims_for("ext-1").is_some());
    assert_eq!(mocks.journal.count("events.publish"), 1);
    assert!(mocks.events.published().is_empty());
}

// =============================================================================
// MintToken
// =============================================================================

#[tokio::test]
async fn test_mint_token_for_missing_user() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();

    let minted = users
        .mint_token(7, Some(15), None, &cancel)
        .await
        .expect("Failed to mint token");

    let expected = Utc::now() + ChronoDuration::minutes(15);
    assert!((minted.expires_at - expected).num_seconds().abs() < 60);
    assert!(minted.token.starts_with("token_for_user_7_"));
    assert_eq!(mocks.journal.count("store.get_user"), 0);

    let issued = mocks.identity.minted_for("7");
    assert_eq!(issued.len(), 1);
    assert_eq!(issued[0].1, Duration::from_secs(15 * 60));
}

#[tokio::test]
async fn test_mint_token_uses_default_ttl() {
    let options = UserManagementOptions {
        default_token_ttl_minutes: 60,
        ..Default::default()
    };
    let (mocks, users) = setup_with(options);
    let cancel = CancellationToken::new();

    users.mint_token(1, None, None, &cancel).await.unwrap();

    assert_eq!(mocks.identity.minted_for("1")[0].1, Duration::from_secs(3600));
}

#[tokio::test]
async fn test_mint_token_rejects_reserved_claims() {
    let (_mocks, users) = setup();
    let cancel = CancellationToken::new();
    let claims = json!({ "sub": "someone-else" }).as_object().cloned();

    let err = users.mint_token(1, None, claims, &cancel).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::ProviderError);
}

// =============================================================================
// Concurrency, cancellation and timeouts
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_user_operations_never_interleave() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    users.get_user(1, &cancel).await.unwrap();
    let gate = mocks.store.faults().hold(1);

    let status = {
        let users = users.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { users.set_status(1, UserStatus::Banned, &cancel).await })
    };
    gate.entered().await;

    let roles_update = {
        let users = users.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            users
                .update_roles(1, strings(&["admin"]), vec![], &cancel)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The second operation is queued behind the parked write.
    assert_eq!(mocks.journal.count("store.update_roles"), 0);

    gate.open();
    status.await.unwrap().expect("Failed to set status");
    roles_update.await.unwrap().expect("Failed to update roles");

    assert_eq!(mocks.journal.max_in_flight("1"), 1);
    let stored = mocks.store.get(1).unwrap();
    assert_eq!(stored.status, UserStatus::Banned);
    assert_eq!(stored.roles, roles(&["admin", "player"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_users_run_in_parallel() {
    let (mocks, users) = setup();
    mocks.store.insert(UserRecord::new(2, "ext-2"));
    let cancel = CancellationToken::new();
    let gate = mocks.store.faults().hold(1);

    let parked = {
        let users = users.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { users.get_user(1, &cancel).await })
    };
    gate.entered().await;

    // User 2 is served while user 1 is stuck in its store call.
    let other = users.get_user(2, &cancel).await.expect("Failed to get user 2");
    assert_eq!(other.user_id, 2);
    assert!(!parked.is_finished());

    gate.open();
    parked.await.unwrap().expect("Failed to get user 1");
}

#[tokio::test]
async fn test_cancel_mid_turn_stops_call_and_keeps_cache() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    users.get_user(1, &cancel).await.unwrap();
    let gate = mocks.store.faults().hold(1);

    let op_cancel = CancellationToken::new();
    let task = {
        let users = users.clone();
        let op_cancel = op_cancel.clone();
        tokio::spawn(async move { users.set_status(1, UserStatus::Banned, &op_cancel).await })
    };
    gate.entered().await;
    op_cancel.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert_eq!(err.code(), ErrorCode::Cancelled);

    gate.open();
    assert_eq!(mocks.store.get(1).unwrap().status, UserStatus::Active);
    assert_eq!(
        users.get_user(1, &cancel).await.unwrap().status,
        UserStatus::Active
    );
    assert!(mocks.events.published().is_empty());
}

#[tokio::test]
async fn test_cancel_while_queued_skips_the_turn() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();
    users.get_user(1, &cancel).await.unwrap();
    let gate = mocks.store.faults().hold(1);

    let first = {
        let users = users.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { users.set_status(1, UserStatus::Banned, &cancel).await })
    };
    gate.entered().await;

    let queued_cancel = CancellationToken::new();
    let queued = {
        let users = users.clone();
        let queued_cancel = queued_cancel.clone();
        tokio::spawn(async move {
            users
                .set_status(1, UserStatus::ShadowBanned, &queued_cancel)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    queued_cancel.cancel();
    gate.open();

    first.await.unwrap().expect("Failed to set status");
    let err = queued.await.unwrap().unwrap_err();
    assert_eq!(err.code(), ErrorCode::Cancelled);
    assert_eq!(mocks.journal.count("store.set_status"), 1);
    assert_eq!(mocks.store.get(1).unwrap().status, UserStatus::Banned);
}

#[tokio::test(start_paused = true)]
async fn test_slow_collaborator_times_out() {
    let options = UserManagementOptions {
        collaborator_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let (mocks, users) = setup_with(options);
    let cancel = CancellationToken::new();
    let _gate = mocks.store.faults().hold(1);

    let err = users.get_user(1, &cancel).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Timeout);
    assert_eq!(err, UserError::Timeout("store.get_user".into()));
}

// =============================================================================
// Activation lifecycle
// =============================================================================

#[tokio::test]
async fn test_non_positive_ids_are_ordinary_keys() {
    let (mocks, users) = setup();
    let cancel = CancellationToken::new();

    let zero = users
        .mint_token(0, Some(15), None, &cancel)
        .await
        .expect("Failed to mint token for user 0");
    assert!(zero.token.starts_with("token_for_user_0_"));

    let negative = users
        .mint_token(-7, Some(15), None, &cancel)
        .await
        .expect("Failed to mint token for user -7");
    assert!(negative.token.starts_with("token_for_user_-7_"));

    assert_eq!(users.get_user(-7, &cancel).await, Err(UserError::NotFound(-7)));
    assert_eq!(mocks.journal.count("store.get_user"), 1);
    assert_eq!(users.activation_state(&-7), ActorState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_idle_eviction_drops_the_cache() {
    let mut options = UserManagementOptions::default();
    options.runtime = options.runtime.with_idle_timeout(Duration::from_secs(1));
    let (mocks, users) = setup_with(options);
    let cancel = CancellationToken::new();

    users.get_user(1, &cancel).await.unwrap();
    users.get_user(1, &cancel).await.unwrap();
    assert_eq!(mocks.journal.count("store.get_user"), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(users.activation_state(&1), ActorState::Inactive);

    // A fresh activation starts with an empty cache.
    mocks.store.insert(UserRecord::new(1, "ext-1").with_status(UserStatus::Banned));
    let user = users.get_user(1, &cancel).await.unwrap();
    assert_eq!(user.status, UserStatus::Banned);
    assert_eq!(mocks.journal.count("store.get_user"), 2);
}

#[tokio::test]
async fn test_shutdown_rejects_new_requests() {
    let (_mocks, users) = setup();
    let cancel = CancellationToken::new();
    users.get_user(1, &cancel).await.unwrap();

    users.shutdown().await;

    let err = users.get_user(1, &cancel).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnknownError);
    assert_eq!(users.activation_state(&1), ActorState::Inactive);
}
