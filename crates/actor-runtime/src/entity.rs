//! # ActorEntity Trait
//!
//! The contract a keyed entity implements to be hosted by an [`ActorRuntime`](crate::ActorRuntime).
//!
//! An entity is bound to one key for the lifetime of its activation. The runtime creates it
//! lazily through [`ActorEntity::activate`] on the first message for that key, feeds it
//! requests one at a time through [`ActorEntity::handle`], and tears it down after an idle
//! period through [`ActorEntity::on_deactivate`].
//!
//! Because no two requests for the same key ever run concurrently, `handle` receives
//! `&mut self` and may mutate the entity's cached state without any locking.

use crate::error::FrameworkError;
use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use tokio_util::sync::CancellationToken;

/// Why an activation is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivationReason {
    /// The mailbox stayed empty for the configured idle window.
    IdleTimeout,
    /// `activate` returned an error; the entity never became active.
    ActivationFailed,
    /// The runtime is shutting down.
    Shutdown,
}

/// Trait that any keyed entity must implement to be hosted by the runtime.
///
/// # Requests and Replies
/// `Request` is usually an enum whose variants each carry their own
/// [`Response`](crate::Response) channel, so every operation has a typed reply
/// (the same shape as a hand-written actor message enum). The runtime never looks inside a
/// request; when a request cannot be given a turn (cancelled while queued, activation failed,
/// shutdown) it hands it back through [`ActorEntity::reject`] so the entity can answer the
/// waiting caller with a typed error.
///
/// # Context
/// `Context` holds the shared dependencies (gateways, options) every activation needs.
/// It is created once and shared by all activations of the runtime.
#[async_trait]
pub trait ActorEntity: Sized + Send + 'static {
    /// The key an activation is bound to (e.g., a user id).
    type Key: Eq + Hash + Clone + Send + Sync + Display + Debug + 'static;

    /// The message type processed by the entity.
    type Request: Send + Debug + 'static;

    /// Shared dependencies injected into every activation.
    type Context: Send + Sync + 'static;

    /// The error type for this entity. Runtime failures must convert into it.
    type Error: std::error::Error + From<FrameworkError> + Send + Sync + 'static;

    /// Build the in-memory instance for `key`.
    ///
    /// Called once per activation, before the first request is processed. On error the
    /// queued requests are rejected with [`FrameworkError::ActivationFailed`] and the
    /// handle is discarded, so a later request retries activation.
    async fn activate(key: &Self::Key, ctx: &Self::Context) -> Result<Self, Self::Error>;

    /// Process one request. This is one complete turn.
    async fn handle(
        &mut self,
        request: Self::Request,
        ctx: &Self::Context,
        cancel: &CancellationToken,
    );

    /// Answer a request that will never get a turn.
    fn reject(request: Self::Request, error: FrameworkError);

    /// Called once before the activation is dropped.
    async fn on_deactivate(&mut self, _reason: DeactivationReason, _ctx: &Self::Context) {}
}
