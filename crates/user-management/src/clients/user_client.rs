//! # User Management Client
//!
//! High-level API for the User actors. Every method routes to the actor for one user id
//! and waits for that actor's reply; `cancel` aborts the wait and any collaborator call
//! the actor is making on the caller's behalf.
use crate::gateways::Claims;
use crate::model::{MintedToken, UserId, UserRecord, UserStatus};
use crate::user_actor::{EffectiveRoleChange, UserActor, UserCommand, UserError};
use actor_runtime::{ActorClient, ActorRuntime, FrameworkError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Client for the User actors. Clones share the same runtime.
#[derive(Clone)]
pub struct UserManagementClient {
    runtime: ActorRuntime<UserActor>,
}

impl UserManagementClient {
    pub fn new(runtime: ActorRuntime<UserActor>) -> Self {
        Self { runtime }
    }

    /// Returns the user, loading it into the actor's cache on first access.
    #[instrument(skip(self, cancel))]
    pub async fn get_user(
        &self,
        user_id: UserId,
        cancel: &CancellationToken,
    ) -> Result<UserRecord, UserError> {
        debug!("Sending request");
        self.runtime
            .call(&user_id, cancel, |respond_to| UserCommand::GetUser { respond_to })
            .await
    }

    /// Moves the user to `status`. Fails with `Duplicate` if the user already has it.
    #[instrument(skip(self, cancel))]
    pub async fn set_status(
        &self,
        user_id: UserId,
        status: UserStatus,
        cancel: &CancellationToken,
    ) -> Result<(), UserError> {
        debug!("Sending request");
        self.runtime
            .call(&user_id, cancel, |respond_to| UserCommand::SetStatus {
                status,
                respond_to,
            })
            .await
    }

    /// Adds and removes roles in one write and returns what actually changed.
    #[instrument(skip(self, cancel))]
    pub async fn update_roles(
        &self,
        user_id: UserId,
        add: Vec<String>,
        remove: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<EffectiveRoleChange, UserError> {
        debug!("Sending request");
        self.runtime
            .call(&user_id, cancel, |respond_to| UserCommand::UpdateRoles {
                add,
                remove,
                respond_to,
            })
            .await
    }

    #[instrument(skip(self, extra_claims, cancel))]
    pub async fn mint_token(
        &self,
        user_id: UserId,
        ttl_minutes: Option<u32>,
        extra_claims: Option<Claims>,
        cancel: &CancellationToken,
    ) -> Result<MintedToken, UserError> {
        debug!(extra_claims = ?extra_claims, "Sending request");
        self.runtime
            .call(&user_id, cancel, |respond_to| UserCommand::MintToken {
                ttl_minutes,
                extra_claims,
                respond_to,
            })
            .await
    }
}

impl ActorClient<UserActor> for UserManagementClient {
    type Error = UserError;

    fn runtime(&self) -> &ActorRuntime<UserActor> {
        &self.runtime
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        e.into()
    }
}
