//! End-to-end runs over the in-memory system: real store, provider and event bus.

use serde_json::json;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use user_management::config::UserManagementOptions;
use user_management::lifecycle::IdentitySystem;
use user_management::model::{UserRecord, UserStatus};
use user_management::outcome::{ErrorCode, ErrorInfo};

fn options() -> UserManagementOptions {
    let vars: HashMap<String, String> = [
        ("EVENTS_SOURCE", "test.users"),
        ("EVENTS_CHANGED_BY", "integration"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    UserManagementOptions::from_vars(&vars).expect("Invalid options")
}

/// User 42, active with [player]: ban, ban again, then change roles.
#[tokio::test]
async fn test_moderation_scenario_end_to_end() {
    let system = IdentitySystem::in_memory(options());
    system
        .store
        .insert(UserRecord::new(42, "ext-42").with_roles(["player"]));
    let mut events = system.events.subscribe();
    let cancel = CancellationToken::new();

    system
        .users
        .set_status(42, UserStatus::Banned, &cancel)
        .await
        .expect("Failed to ban user");

    let repeat = system
        .users
        .set_status(42, UserStatus::Banned, &cancel)
        .await;
    let info = ErrorInfo::from(&repeat);
    assert_eq!(info.code, 1005);
    assert_eq!(info.error_code(), ErrorCode::Duplicate);

    let change = system
        .users
        .update_roles(42, vec!["moderator".into()], vec!["player".into()], &cancel)
        .await
        .expect("Failed to update roles");
    assert!(change.added.contains("moderator"));
    assert!(change.removed.contains("player"));

    // Exactly one event per committed change, in order.
    let first = events.try_recv().expect("Missing status event");
    assert_eq!(first.event_type, "UserStatusChanged");
    assert_eq!(first.source, "test.users");
    assert_eq!(first.subject, "42");
    assert_eq!(first.specversion, "1.0");
    assert_eq!(first.datacontenttype, "application/json");
    assert_eq!(first.data["previousStatus"], json!("active"));
    assert_eq!(first.data["newStatus"], json!("banned"));
    assert_eq!(first.data["changedBy"], json!("integration"));

    let second = events.try_recv().expect("Missing roles event");
    assert_eq!(second.event_type, "UserRolesUpdated");
    assert_eq!(second.data["addedRoles"], json!(["moderator"]));
    assert_eq!(second.data["removedRoles"], json!(["player"]));
    assert!(events.try_recv().is_err());

    let claims = system.identity.claims_for("ext-42").expect("Claims not synced");
    assert_eq!(claims["status"], json!("banned"));
    assert_eq!(claims["roles"], json!(["moderator"]));

    let stored = system.store.get(42).unwrap();
    assert_eq!(stored.status, UserStatus::Banned);
    assert!(stored.updated_at >= stored.created_at);

    system.shutdown().await;
}

/// With nobody listening the bus refuses the event; the operation still succeeds.
#[tokio::test]
async fn test_no_subscribers_does_not_fail_the_operation() {
    let system = IdentitySystem::in_memory(options());
    system.store.insert(UserRecord::new(5, "ext-5"));
    let cancel = CancellationToken::new();

    let result = system
        .users
        .set_status(5, UserStatus::ShadowBanned, &cancel)
        .await;

    assert_eq!(result, Ok(()));
    assert_eq!(system.store.get(5).unwrap().status, UserStatus::ShadowBanned);
    system.shutdown().await;
}

/// A record without an external id cannot be mirrored to the provider.
#[tokio::test]
async fn test_provider_rejection_maps_to_provider_error() {
    let system = IdentitySystem::in_memory(options());
    system.store.insert(UserRecord::new(6, ""));
    let cancel = CancellationToken::new();

    let err = system
        .users
        .set_status(6, UserStatus::Banned, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ProviderError);
    assert_eq!(ErrorInfo::from(&err).code, 1004);
    // Committed before the sync failed.
    assert_eq!(system.store.get(6).unwrap().status, UserStatus::Banned);
    system.shutdown().await;
}

#[tokio::test]
async fn test_many_users_concurrently() {
    let system = IdentitySystem::in_memory(options());
    for user_id in 1..=20 {
        system
            .store
            .insert(UserRecord::new(user_id, format!("ext-{user_id}")));
    }
    let cancel = CancellationToken::new();

    let mut handles = Vec::new();
    for user_id in 1..=20 {
        let users = system.users.clone();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            users.set_status(user_id, UserStatus::Banned, &cancel).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().expect("Failed to ban user");
    }

    for user_id in 1..=20 {
        assert_eq!(system.store.get(user_id).unwrap().status, UserStatus::Banned);
        let claims = system.identity.claims_for(&format!("ext-{user_id}")).unwrap();
        assert_eq!(claims["status"], json!("banned"));
    }
    system.shutdown().await;
}
