//! # Pipeline Steps
//!
//! The stages `SetStatus` and `UpdateRoles` are built from. Every stage works on a
//! [`Turn`], the per-call state of one operation: the actor's cache is moved in for the
//! duration of the call and the operation's own scratch values live in `op`.
//!
//! Ordering inside both pipelines is fixed: load, no-op check, durable write, cache update,
//! claims sync, publish. The cache is only touched after the durable write succeeded.

use crate::gateways::Claims;
use crate::model::{
    DomainEvent, UserId, UserRecord, UserRolesUpdated, UserStatus, UserStatusChanged,
};
use crate::outcome::{Outcome, Step};
use crate::user_actor::{EffectiveRoleChange, UserContext, UserError};
use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Per-call state threaded through a pipeline.
pub(crate) struct Turn<Op> {
    pub user_id: UserId,
    pub ctx: UserContext,
    pub cancel: CancellationToken,
    pub cache: Option<UserRecord>,
    pub op: Op,
}

impl<Op> Turn<Op> {
    fn cached(&self) -> Outcome<&UserRecord> {
        self.cache
            .as_ref()
            .ok_or_else(|| UserError::Unknown(format!("User {} is not loaded", self.user_id)))
    }
}

/// Scratch for `SetStatus`.
pub(crate) struct StatusChange {
    pub requested: UserStatus,
    pub previous: UserStatus,
}

impl StatusChange {
    pub fn new(requested: UserStatus) -> Self {
        Self {
            requested,
            previous: UserStatus::Unspecified,
        }
    }
}

/// Scratch for `UpdateRoles`.
pub(crate) struct RoleChange {
    pub add: Vec<String>,
    pub remove: Vec<String>,
    pub effective: EffectiveRoleChange,
}

impl RoleChange {
    pub fn new(add: Vec<String>, remove: Vec<String>) -> Self {
        Self {
            add,
            remove,
            effective: EffectiveRoleChange::default(),
        }
    }
}

/// Reads a record through the store.
pub(crate) async fn load_user(
    ctx: &UserContext,
    cancel: &CancellationToken,
    user_id: UserId,
) -> Outcome<UserRecord> {
    let store = &ctx.store;
    ctx.guarded(cancel, "store.get_user", async move {
        store.get_user(user_id).await.map_err(UserError::from)
    })
    .await
}

/// Hands `event` to the publisher. Failures are logged and dropped.
async fn publish_best_effort<Op>(turn: &Turn<Op>, event: DomainEvent) {
    let events = &turn.ctx.events;
    let published = turn
        .ctx
        .guarded(&turn.cancel, "events.publish", async {
            events
                .publish(&event)
                .await
                .map_err(|e| UserError::Unknown(e.to_string()))
        })
        .await;

    match published {
        Ok(()) => debug!(
            user_id = turn.user_id,
            event_type = event.event_type(),
            "Event published"
        ),
        Err(e) => error!(
            user_id = turn.user_id,
            event_type = event.event_type(),
            error = %e,
            "Failed to publish event, operation result unaffected"
        ),
    }
}

// --- Shared steps ---

pub(crate) struct LoadCachedUser;

#[async_trait]
impl<Op: Send + Sync> Step<Turn<Op>> for LoadCachedUser {
    fn name(&self) -> &'static str {
        "load_cached_user"
    }

    async fn run(&self, turn: &mut Turn<Op>) -> Outcome<()> {
        if turn.cache.is_none() {
            let user = load_user(&turn.ctx, &turn.cancel, turn.user_id).await?;
            turn.cache = Some(user);
        }
        Ok(())
    }
}

/// Mirrors the cached `{roles, status}` to the identity provider.
pub(crate) struct SyncClaims;

#[async_trait]
impl<Op: Send + Sync> Step<Turn<Op>> for SyncClaims {
    fn name(&self) -> &'static str {
        "sync_claims"
    }

    async fn run(&self, turn: &mut Turn<Op>) -> Outcome<()> {
        if turn.ctx.options.disable_provider_sync {
            debug!(user_id = turn.user_id, "Provider sync disabled, skipping claims");
            return Ok(());
        }

        let user = turn.cached()?;
        let external_id = user.external_id.clone();
        let claims: Claims = user.claims();
        let identity = &turn.ctx.identity;
        turn.ctx
            .guarded(&turn.cancel, "identity.set_claims", async move {
                identity
                    .set_claims(&external_id, &claims)
                    .await
                    .map_err(UserError::from)
            })
            .await
    }
}

// --- SetStatus ---

pub(crate) struct EnsureStatusChanged;

#[async_trait]
impl Step<Turn<StatusChange>> for EnsureStatusChanged {
    fn name(&self) -> &'static str {
        "ensure_status_changed"
    }

    async fn run(&self, turn: &mut Turn<StatusChange>) -> Outcome<()> {
        let current = turn.cached()?.status;
        if current == turn.op.requested {
            info!(user_id = turn.user_id, %current, "Status unchanged, skipping update");
            return Err(UserError::Duplicate(format!(
                "User {} is already {}",
                turn.user_id, current
            )));
        }
        turn.op.previous = current;
        Ok(())
    }
}

pub(crate) struct PersistStatus;

#[async_trait]
impl Step<Turn<StatusChange>> for PersistStatus {
    fn name(&self) -> &'static str {
        "persist_status"
    }

    async fn run(&self, turn: &mut Turn<StatusChange>) -> Outcome<()> {
        let user_id = turn.user_id;
        let status = turn.op.requested;
        let store = &turn.ctx.store;
        let rows = turn
            .ctx
            .guarded(&turn.cancel, "store.set_status", async move {
                store.set_status(user_id, status).await.map_err(UserError::from)
            })
            .await?;

        if rows == 0 {
            return Err(UserError::NotFound(user_id));
        }
        Ok(())
    }
}

pub(crate) struct UpdateCachedStatus;

#[async_trait]
impl Step<Turn<StatusChange>> for UpdateCachedStatus {
    fn name(&self) -> &'static str {
        "update_cached_status"
    }

    async fn run(&self, turn: &mut Turn<StatusChange>) -> Outcome<()> {
        let user_id = turn.user_id;
        let user = turn
            .cache
            .as_mut()
            .ok_or_else(|| UserError::Unknown(format!("User {user_id} is not loaded")))?;
        user.status = turn.op.requested;
        user.updated_at = Utc::now();
        Ok(())
    }
}

pub(crate) struct PublishStatusChanged;

#[async_trait]
impl Step<Turn<StatusChange>> for PublishStatusChanged {
    fn name(&self) -> &'static str {
        "publish_status_changed"
    }

    async fn run(&self, turn: &mut Turn<StatusChange>) -> Outcome<()> {
        let event = DomainEvent::status_changed(UserStatusChanged {
            user_id: turn.user_id,
            previous_status: turn.op.previous,
            new_status: turn.op.requested,
            changed_by: turn.ctx.options.changed_by.clone(),
            changed_at: Utc::now(),
        });
        publish_best_effort(turn, event).await;
        Ok(())
    }
}

// --- UpdateRoles ---

pub(crate) struct ValidateRoleChanges;

#[async_trait]
impl Step<Turn<RoleChange>> for ValidateRoleChanges {
    fn name(&self) -> &'static str {
        "validate_role_changes"
    }

    async fn run(&self, turn: &mut Turn<RoleChange>) -> Outcome<()> {
        EffectiveRoleChange::validate_request(&turn.op.add, &turn.op.remove)
    }
}

pub(crate) struct EnsureRolesChanged;

#[async_trait]
impl Step<Turn<RoleChange>> for EnsureRolesChanged {
    fn name(&self) -> &'static str {
        "ensure_roles_changed"
    }

    async fn run(&self, turn: &mut Turn<RoleChange>) -> Outcome<()> {
        let current = &turn.cached()?.roles;
        let effective = EffectiveRoleChange::compute(current, &turn.op.add, &turn.op.remove);
        if effective.is_empty() {
            info!(user_id = turn.user_id, "No effective role changes, skipping update");
            return Err(UserError::Duplicate(
                "No effective role changes".to_string(),
            ));
        }
        debug!(
            user_id = turn.user_id,
            added = ?effective.added,
            removed = ?effective.removed,
            "Effective role changes"
        );
        turn.op.effective = effective;
        Ok(())
    }
}

pub(crate) struct PersistRoles;

#[async_trait]
impl Step<Turn<RoleChange>> for PersistRoles {
    fn name(&self) -> &'static str {
        "persist_roles"
    }

    async fn run(&self, turn: &mut Turn<RoleChange>) -> Outcome<()> {
        let user_id = turn.user_id;
        let effective = &turn.op.effective;
        let store = &turn.ctx.store;
        let rows = turn
            .ctx
            .guarded(&turn.cancel, "store.update_roles", async move {
                store
                    .update_roles(user_id, &effective.added, &effective.removed)
                    .await
                    .map_err(UserError::from)
            })
            .await?;

        if rows == 0 {
            return Err(UserError::NotFound(user_id));
        }
        Ok(())
    }
}

pub(crate) struct UpdateCachedRoles;

#[async_trait]
impl Step<Turn<RoleChange>> for UpdateCachedRoles {
    fn name(&self) -> &'static str {
        "update_cached_roles"
    }

    async fn run(&self, turn: &mut Turn<RoleChange>) -> Outcome<()> {
        let user_id = turn.user_id;
        let user = turn
            .cache
            .as_mut()
            .ok_or_else(|| UserError::Unknown(format!("User {user_id} is not loaded")))?;
        turn.op.effective.apply(&mut user.roles);
        user.updated_at = Utc::now();
        Ok(())
    }
}

pub(crate) struct PublishRolesUpdated;

#[async_trait]
impl Step<Turn<RoleChange>> for PublishRolesUpdated {
    fn name(&self) -> &'static str {
        "publish_roles_updated"
    }

    async fn run(&self, turn: &mut Turn<RoleChange>) -> Outcome<()> {
        let roles = turn.cached()?.roles.clone();
        let event = DomainEvent::roles_updated(UserRolesUpdated {
            user_id: turn.user_id,
            added_roles: turn.op.effective.added.clone(),
            removed_roles: turn.op.effective.removed.clone(),
            roles,
            changed_by: turn.ctx.options.changed_by.clone(),
            changed_at: Utc::now(),
        });
        publish_best_effort(turn, event).await;
        Ok(())
    }
}
