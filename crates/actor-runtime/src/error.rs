//! # Framework Errors
//!
//! Errors raised by the runtime itself, independent of any entity's business logic.
//! Entities convert these into their own error type (`E::Error: From<FrameworkError>`)
//! so callers only ever see one error enum per actor.

/// Errors that can occur within the actor runtime itself.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Actor activation failed: {0}")]
    ActivationFailed(String),
    #[error("Request cancelled before its turn")]
    Cancelled,
    #[error("Runtime is shutting down")]
    ShuttingDown,
}
