//! [`ActorEntity`] implementation for the User actor.
//!
//! One `UserActor` exists per active user id. It owns the cached [`UserRecord`] and runs
//! each [`UserCommand`] as one turn; the runtime guarantees no two turns for the same user
//! overlap, so the cache needs no lock.

use super::steps::{
    load_user, EnsureRolesChanged, EnsureStatusChanged, LoadCachedUser, PersistRoles,
    PersistStatus, PublishRolesUpdated, PublishStatusChanged, RoleChange, StatusChange,
    SyncClaims, Turn, UpdateCachedRoles, UpdateCachedStatus, ValidateRoleChanges,
};
use super::{EffectiveRoleChange, UserCommand, UserContext, UserError};
use crate::gateways::Claims;
use crate::model::{MintedToken, UserId, UserRecord, UserStatus};
use crate::outcome::{run_pipeline, Outcome};
use actor_runtime::{ActorEntity, DeactivationReason, FrameworkError};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The in-memory activation of one user.
#[derive(Debug)]
pub struct UserActor {
    user_id: UserId,
    cache: Option<UserRecord>,
}

impl UserActor {
    async fn get_user(
        &mut self,
        ctx: &UserContext,
        cancel: &CancellationToken,
    ) -> Outcome<UserRecord> {
        if let Some(user) = &self.cache {
            debug!(user_id = self.user_id, "Serving cached user");
            return Ok(user.clone());
        }
        let user = load_user(ctx, cancel, self.user_id).await?;
        self.cache = Some(user.clone());
        Ok(user)
    }

    async fn set_status(
        &mut self,
        status: UserStatus,
        ctx: &UserContext,
        cancel: &CancellationToken,
    ) -> Outcome<()> {
        let mut turn = self.begin_turn(ctx, cancel, StatusChange::new(status));
        let result = run_pipeline(
            "set_status",
            &mut turn,
            &[
                &LoadCachedUser,
                &EnsureStatusChanged,
                &PersistStatus,
                &UpdateCachedStatus,
                &SyncClaims,
                &PublishStatusChanged,
            ],
        )
        .await;
        self.cache = turn.cache;
        result
    }

    async fn update_roles(
        &mut self,
        add: Vec<String>,
        remove: Vec<String>,
        ctx: &UserContext,
        cancel: &CancellationToken,
    ) -> Outcome<EffectiveRoleChange> {
        let mut turn = self.begin_turn(ctx, cancel, RoleChange::new(add, remove));
        let result = run_pipeline(
            "update_roles",
            &mut turn,
            &[
                &LoadCachedUser,
                &ValidateRoleChanges,
                &EnsureRolesChanged,
                &PersistRoles,
                &UpdateCachedRoles,
                &SyncClaims,
                &PublishRolesUpdated,
            ],
        )
        .await;
        self.cache = turn.cache;
        result.map(|()| turn.op.effective)
    }

    /// Mints a token without touching the cache or the store.
    async fn mint_token(
        &self,
        ttl_minutes: Option<u32>,
        extra_claims: Option<Claims>,
        ctx: &UserContext,
        cancel: &CancellationToken,
    ) -> Outcome<MintedToken> {
        let ttl_minutes = ttl_minutes.unwrap_or(ctx.options.default_token_ttl_minutes);
        let ttl = Duration::from_secs(u64::from(ttl_minutes) * 60);
        let uid = self.user_id.to_string();
        let identity = &ctx.identity;

        let token = ctx
            .guarded(cancel, "identity.mint_custom_token", async {
                identity
                    .mint_custom_token(&uid, extra_claims.as_ref(), ttl)
                    .await
                    .map_err(UserError::from)
            })
            .await?;

        Ok(MintedToken {
            token,
            expires_at: Utc::now() + chrono::Duration::minutes(i64::from(ttl_minutes)),
        })
    }

    /// Moves the cache into the per-call state; the caller puts it back afterwards.
    fn begin_turn<Op>(
        &mut self,
        ctx: &UserContext,
        cancel: &CancellationToken,
        op: Op,
    ) -> Turn<Op> {
        Turn {
            user_id: self.user_id,
            ctx: ctx.clone(),
            cancel: cancel.clone(),
            cache: self.cache.take(),
            op,
        }
    }
}

fn log_outcome<T>(operation: &'static str, user_id: UserId, outcome: &Outcome<T>) {
    match outcome {
        Ok(_) => info!(user_id, operation, "Operation succeeded"),
        Err(UserError::Duplicate(reason)) => info!(user_id, operation, %reason, "No-op"),
        Err(e) => warn!(user_id, operation, code = ?e.code(), error = %e, "Operation failed"),
    }
}

#[async_trait]
impl ActorEntity for UserActor {
    type Key = UserId;
    type Request = UserCommand;
    type Context = UserContext;
    type Error = UserError;

    /// Activation is cheap: the record is loaded lazily by the first operation that needs it.
    async fn activate(user_id: &UserId, _ctx: &UserContext) -> Result<Self, UserError> {
        Ok(Self {
            user_id: *user_id,
            cache: None,
        })
    }

    async fn handle(
        &mut self,
        request: UserCommand,
        ctx: &UserContext,
        cancel: &CancellationToken,
    ) {
        let operation = request.name();
        match request {
            UserCommand::GetUser { respond_to } => {
                let outcome = self.get_user(ctx, cancel).await;
                log_outcome(operation, self.user_id, &outcome);
                let _ = respond_to.send(outcome);
            }
            UserCommand::SetStatus { status, respond_to } => {
                let outcome = self.set_status(status, ctx, cancel).await;
                log_outcome(operation, self.user_id, &outcome);
                let _ = respond_to.send(outcome);
            }
            UserCommand::UpdateRoles {
                add,
                remove,
                respond_to,
            } => {
                let outcome = self.update_roles(add, remove, ctx, cancel).await;
                log_outcome(operation, self.user_id, &outcome);
                let _ = respond_to.send(outcome);
            }
            UserCommand::MintToken {
                ttl_minutes,
                extra_claims,
                respond_to,
            } => {
                let outcome = self.mint_token(ttl_minutes, extra_claims, ctx, cancel).await;
                log_outcome(operation, self.user_id, &outcome);
                let _ = respond_to.send(outcome);
            }
        }
    }

    fn reject(request: UserCommand, error: FrameworkError) {
        request.fail(error.into());
    }

    async fn on_deactivate(&mut self, reason: DeactivationReason, _ctx: &UserContext) {
        debug!(
            user_id = self.user_id,
            ?reason,
            cached = self.cache.is_some(),
            "Dropping cached user"
        );
    }
}
