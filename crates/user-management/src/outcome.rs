//! # Outcomes & Pipelines
//!
//! Every user operation returns an [`Outcome`]: the payload on success, or a [`UserError`]
//! that carries an [`ErrorCode`]. [`ErrorInfo`] is the flattened form handed across a
//! process boundary.
//!
//! Multi-step operations are written as a list of [`Step`]s run by [`run_pipeline`]. The
//! first step that fails stops the pipeline and its error is returned as-is; later steps
//! never run.

use crate::user_actor::UserError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of a user operation.
pub type Outcome<T> = Result<T, UserError>;

/// Stable numeric error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    Success,
    NotFound,
    ValidationError,
    PersistenceError,
    ProviderError,
    Duplicate,
    Cancelled,
    Timeout,
    ActivationError,
    UnknownError,
}

impl ErrorCode {
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::NotFound => 1001,
            Self::ValidationError => 1002,
            Self::PersistenceError => 1003,
            Self::ProviderError => 1004,
            Self::Duplicate => 1005,
            Self::Cancelled => 1006,
            Self::Timeout => 1007,
            Self::ActivationError => 1008,
            Self::UnknownError => 1999,
        }
    }

    /// Unrecognized codes decode as `UnknownError`.
    pub const fn from_i32(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1001 => Self::NotFound,
            1002 => Self::ValidationError,
            1003 => Self::PersistenceError,
            1004 => Self::ProviderError,
            1005 => Self::Duplicate,
            1006 => Self::Cancelled,
            1007 => Self::Timeout,
            1008 => Self::ActivationError,
            _ => Self::UnknownError,
        }
    }
}

/// Wire form of an outcome: `{ code, message, params }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: i32,
    pub message: String,
    pub params: Vec<String>,
}

impl ErrorInfo {
    pub fn success() -> Self {
        Self {
            code: ErrorCode::Success.as_i32(),
            message: String::new(),
            params: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == ErrorCode::Success.as_i32()
    }

    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from_i32(self.code)
    }
}

impl From<&UserError> for ErrorInfo {
    fn from(e: &UserError) -> Self {
        Self {
            code: e.code().as_i32(),
            message: e.to_string(),
            params: e.params(),
        }
    }
}

impl<T> From<&Outcome<T>> for ErrorInfo {
    fn from(outcome: &Outcome<T>) -> Self {
        match outcome {
            Ok(_) => ErrorInfo::success(),
            Err(e) => e.into(),
        }
    }
}

/// One stage of a short-circuiting pipeline over per-call state `S`.
#[async_trait]
pub trait Step<S: Send>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self, state: &mut S) -> Outcome<()>;
}

/// Runs `steps` in order, stopping at the first failure.
pub async fn run_pipeline<S: Send>(
    pipeline: &'static str,
    state: &mut S,
    steps: &[&dyn Step<S>],
) -> Outcome<()> {
    for step in steps {
        debug!(pipeline, step = step.name(), "Running step");
        if let Err(e) = step.run(state).await {
            debug!(pipeline, step = step.name(), code = ?e.code(), "Pipeline stopped");
            return Err(e);
        }
    }
    Ok(())
}
