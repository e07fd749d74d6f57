//! Domain events emitted after a committed change.

use super::{UserId, UserStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Emitted after a status change has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusChanged {
    pub user_id: UserId,
    pub previous_status: UserStatus,
    pub new_status: UserStatus,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// Emitted after a role change has been persisted.
///
/// `added_roles` and `removed_roles` are the effective diff, not what was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRolesUpdated {
    pub user_id: UserId,
    pub added_roles: BTreeSet<String>,
    pub removed_roles: BTreeSet<String>,
    /// Full role set after the change.
    pub roles: BTreeSet<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    StatusChanged(UserStatusChanged),
    RolesUpdated(UserRolesUpdated),
}

/// An event handed to the [`EventPublisher`](crate::gateways::EventPublisher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub user_id: UserId,
    pub payload: EventPayload,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn status_changed(event: UserStatusChanged) -> Self {
        Self {
            user_id: event.user_id,
            occurred_at: event.changed_at,
            payload: EventPayload::StatusChanged(event),
        }
    }

    pub fn roles_updated(event: UserRolesUpdated) -> Self {
        Self {
            user_id: event.user_id,
            occurred_at: event.changed_at,
            payload: EventPayload::RolesUpdated(event),
        }
    }

    /// Event type name used on the bus.
    pub fn event_type(&self) -> &'static str {
        match self.payload {
            EventPayload::StatusChanged(_) => "UserStatusChanged",
            EventPayload::RolesUpdated(_) => "UserRolesUpdated",
        }
    }
}
