use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Primary key of a user record.
pub type UserId = i64;

/// Moderation status of a user.
///
/// Any status may move to any other; moving to the current status is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Unspecified,
    Active,
    Banned,
    ShadowBanned,
}

impl UserStatus {
    /// Storage and claim representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Active => "active",
            Self::Banned => "banned",
            Self::ShadowBanned => "shadow_banned",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user as persisted by the store.
///
/// # Actor Framework
/// Each [`UserActor`](crate::user_actor::UserActor) holds a cached copy of one record;
/// the copy only changes after the store has acknowledged the matching write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    /// Identifier of the user at the identity provider.
    pub external_id: String,
    pub roles: BTreeSet<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Creates an `Active` user with no roles.
    pub fn new(user_id: UserId, external_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            external_id: external_id.into(),
            roles: BTreeSet::new(),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Custom claims mirrored to the identity provider: `{"roles": [...], "status": "..."}`.
    pub fn claims(&self) -> Map<String, Value> {
        let mut claims = Map::new();
        claims.insert("roles".to_string(), json!(self.roles));
        claims.insert("status".to_string(), json!(self.status.as_str()));
        claims
    }
}

/// A custom sign-in token and the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
