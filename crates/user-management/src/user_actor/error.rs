//! Error types for the User actor.

use crate::gateways::{ProviderError, StoreError};
use crate::model::UserId;
use crate::outcome::ErrorCode;
use actor_runtime::FrameworkError;
use thiserror::Error;

/// Errors returned by user operations.
///
/// Every variant maps onto exactly one [`ErrorCode`], which is what crosses the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserError {
    /// The user does not exist (or vanished before the write landed).
    #[error("User not found: {0}")]
    NotFound(UserId),

    /// The request would not change anything.
    #[error("No change: {0}")]
    Duplicate(String),

    /// The request itself is malformed.
    #[error("User validation error: {0}")]
    ValidationError(String),

    /// The durable store failed.
    #[error("User database error: {0}")]
    PersistenceError(String),

    /// The identity provider rejected or failed the claims/token call.
    #[error("Identity provider error: {0}")]
    ProviderError(String),

    /// The caller cancelled the operation.
    #[error("Operation cancelled during {0}")]
    Cancelled(String),

    /// A collaborator call exceeded its time budget.
    #[error("Operation timed out during {0}")]
    Timeout(String),

    /// The actor for this user could not be activated.
    #[error("Actor activation failed: {0}")]
    ActivationError(String),

    /// Anything else, including actor communication failures.
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl UserError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Duplicate(_) => ErrorCode::Duplicate,
            Self::ValidationError(_) => ErrorCode::ValidationError,
            Self::PersistenceError(_) => ErrorCode::PersistenceError,
            Self::ProviderError(_) => ErrorCode::ProviderError,
            Self::Cancelled(_) => ErrorCode::Cancelled,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::ActivationError(_) => ErrorCode::ActivationError,
            Self::Unknown(_) => ErrorCode::UnknownError,
        }
    }

    /// Message parameters carried next to the code.
    pub fn params(&self) -> Vec<String> {
        match self {
            Self::NotFound(user_id) => vec![user_id.to_string()],
            Self::Duplicate(detail)
            | Self::ValidationError(detail)
            | Self::PersistenceError(detail)
            | Self::ProviderError(detail)
            | Self::Cancelled(detail)
            | Self::Timeout(detail)
            | Self::ActivationError(detail)
            | Self::Unknown(detail) => vec![detail.clone()],
        }
    }
}

impl From<FrameworkError> for UserError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::ActivationFailed(reason) => UserError::ActivationError(reason),
            FrameworkError::Cancelled => UserError::Cancelled("queued request".to_string()),
            other => UserError::Unknown(other.to_string()),
        }
    }
}

impl From<StoreError> for UserError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(user_id) => UserError::NotFound(user_id),
            StoreError::Backend(reason) => UserError::PersistenceError(reason),
        }
    }
}

impl From<ProviderError> for UserError {
    fn from(e: ProviderError) -> Self {
        UserError::ProviderError(e.to_string())
    }
}
