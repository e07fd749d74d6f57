//! # User Actor
//!
//! One keyed actor per user id, hosted by an [`ActorRuntime`]. The actor owns a cached
//! [`UserRecord`](crate::model::UserRecord) and is the only writer for its user, so status
//! and role changes for the same user never interleave.
//!
//! ## Structure
//!
//! - [`entity`] - [`ActorEntity`](actor_runtime::ActorEntity) implementation ([`UserActor`])
//! - [`command`] - [`UserCommand`], the messages the actor accepts
//! - [`context`] - [`UserContext`], the collaborators shared by every activation
//! - [`error`] - [`UserError`] and its stable error codes
//! - [`roles`] - role-change arithmetic ([`EffectiveRoleChange`])
//! - [`new()`] - Factory function that creates the runtime and its client
//!
//! ## Operations
//!
//! | Command       | Touches cache | Durable write | Claims sync | Event               |
//! |---------------|---------------|---------------|-------------|---------------------|
//! | `GetUser`     | fills         | -             | -           | -                   |
//! | `SetStatus`   | after write   | status        | yes         | `UserStatusChanged` |
//! | `UpdateRoles` | after write   | roles         | yes         | `UserRolesUpdated`  |
//! | `MintToken`   | -             | -             | -           | -                   |
//!
//! A status or role change that would leave the record as it is fails with
//! [`UserError::Duplicate`] before anything is written.

pub mod command;
pub mod context;
pub mod entity;
pub mod error;
pub mod roles;
mod steps;

pub use command::*;
pub use context::*;
pub use entity::*;
pub use error::*;
pub use roles::*;

use crate::clients::UserManagementClient;
use actor_runtime::ActorRuntime;

/// Creates a User runtime over `ctx` and returns the client that talks to it.
///
/// Runtime tuning (mailbox capacity, idle timeout) comes from `ctx.options.runtime`.
pub fn new(ctx: UserContext) -> UserManagementClient {
    let config = ctx.options.runtime.clone();
    UserManagementClient::new(ActorRuntime::new(ctx, config))
}
