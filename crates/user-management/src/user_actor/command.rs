//! Messages accepted by the User actor.

use crate::gateways::Claims;
use crate::model::{MintedToken, UserRecord, UserStatus};
use crate::user_actor::{EffectiveRoleChange, UserError};
use actor_runtime::Response;

/// One operation on one user. Each variant carries its own reply channel.
#[derive(Debug)]
pub enum UserCommand {
    GetUser {
        respond_to: Response<UserRecord, UserError>,
    },
    SetStatus {
        status: UserStatus,
        respond_to: Response<(), UserError>,
    },
    UpdateRoles {
        add: Vec<String>,
        remove: Vec<String>,
        respond_to: Response<EffectiveRoleChange, UserError>,
    },
    MintToken {
        /// `None` uses the configured default.
        ttl_minutes: Option<u32>,
        extra_claims: Option<Claims>,
        respond_to: Response<MintedToken, UserError>,
    },
}

impl UserCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetUser { .. } => "get_user",
            Self::SetStatus { .. } => "set_status",
            Self::UpdateRoles { .. } => "update_roles",
            Self::MintToken { .. } => "mint_token",
        }
    }

    /// Answers the waiting caller with `error` without running the command.
    pub fn fail(self, error: UserError) {
        match self {
            Self::GetUser { respond_to } => {
                let _ = respond_to.send(Err(error));
            }
            Self::SetStatus { respond_to, .. } => {
                let _ = respond_to.send(Err(error));
            }
            Self::UpdateRoles { respond_to, .. } => {
                let _ = respond_to.send(Err(error));
            }
            Self::MintToken { respond_to, .. } => {
                let _ = respond_to.send(Err(error));
            }
        }
    }
}
