//! # Persistence Gateway
//!
//! The durable home of user records. The actor reads through [`UserStore::get_user`] once
//! per activation and writes through the two mutating calls, which report how many rows
//! they touched so a record deleted underneath the actor surfaces as "not found".

use crate::model::{UserId, UserRecord, UserStatus};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("User {0} not found in store")]
    NotFound(UserId),

    #[error("Store backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch one record. `StoreError::NotFound` when it does not exist.
    async fn get_user(&self, user_id: UserId) -> Result<UserRecord, StoreError>;

    /// Overwrite the status. Returns the number of rows affected.
    async fn set_status(&self, user_id: UserId, status: UserStatus) -> Result<u64, StoreError>;

    /// Apply both role sets in one write. Returns the number of rows affected.
    async fn update_roles(
        &self,
        user_id: UserId,
        add: &BTreeSet<String>,
        remove: &BTreeSet<String>,
    ) -> Result<u64, StoreError>;
}

/// Process-local store backed by a concurrent map.
///
/// Clones share the same records, so a test can keep one handle for seeding and hand
/// another to the actors.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn insert(&self, user: UserRecord) {
        self.users.insert(user.user_id, user);
    }

    pub fn remove(&self, user_id: UserId) -> Option<UserRecord> {
        self.users.remove(&user_id).map(|(_, user)| user)
    }

    /// Snapshot of a record, bypassing any actor cache.
    pub fn get(&self, user_id: UserId) -> Option<UserRecord> {
        self.users.get(&user_id).map(|user| user.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        debug!(user_id, "Store get");
        self.get(user_id).ok_or(StoreError::NotFound(user_id))
    }

    async fn set_status(&self, user_id: UserId, status: UserStatus) -> Result<u64, StoreError> {
        debug!(user_id, %status, "Store set_status");
        match self.users.get_mut(&user_id) {
            Some(mut user) => {
                user.status = status;
                user.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_roles(
        &self,
        user_id: UserId,
        add: &BTreeSet<String>,
        remove: &BTreeSet<String>,
    ) -> Result<u64, StoreError> {
        debug!(user_id, ?add, ?remove, "Store update_roles");
        match self.users.get_mut(&user_id) {
            Some(mut user) => {
                user.roles.extend(add.iter().cloned());
                user.roles.retain(|role| !remove.contains(role));
                user.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
