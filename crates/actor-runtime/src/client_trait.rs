//! # ActorClient Trait
//!
//! Provides a common interface for entity-specific client facades, adding default
//! lifecycle helpers built on top of a shared [`ActorRuntime`].
use crate::{ActorEntity, ActorRuntime, ActorState, FrameworkError};
use async_trait::async_trait;

/// Trait for entity-specific clients to inherit standard lifecycle operations.
///
/// A facade only has to say which runtime it talks to and how runtime failures map into
/// its own error type; `warm_up`, `activation_state` and `shutdown` come for free.
///
/// # Example
///
/// ```rust
/// use actor_runtime::{ActorClient, ActorEntity, ActorRuntime, FrameworkError};
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("counter error: {0}")]
/// struct CounterError(#[from] FrameworkError);
///
/// #[derive(Debug)]
/// struct Increment;
///
/// struct Counter(u64);
///
/// #[async_trait]
/// impl ActorEntity for Counter {
///     type Key = u32;
///     type Request = Increment;
///     type Context = ();
///     type Error = CounterError;
///
///     async fn activate(_: &u32, _: &()) -> Result<Self, CounterError> { Ok(Counter(0)) }
///     async fn handle(&mut self, _: Increment, _: &(), _: &CancellationToken) { self.0 += 1; }
///     fn reject(_: Increment, _: FrameworkError) {}
/// }
///
/// struct CounterClient {
///     runtime: ActorRuntime<Counter>,
/// }
///
/// impl ActorClient<Counter> for CounterClient {
///     type Error = CounterError;
///
///     fn runtime(&self) -> &ActorRuntime<Counter> {
///         &self.runtime
///     }
///
///     fn map_error(e: FrameworkError) -> Self::Error {
///         CounterError(e)
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let client = CounterClient { runtime: ActorRuntime::new((), Default::default()) };
///     client.warm_up(&7).await.unwrap();
///     client.shutdown().await;
/// }
/// ```
#[async_trait]
pub trait ActorClient<E: ActorEntity>: Send + Sync {
    /// The facade-specific error type.
    type Error: Send + Sync;

    /// Access the runtime hosting the entities.
    fn runtime(&self) -> &ActorRuntime<E>;

    /// Map framework errors to the facade's error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    /// Activate `key` ahead of its first request.
    #[tracing::instrument(skip(self))]
    async fn warm_up(&self, key: &E::Key) -> Result<(), Self::Error> {
        tracing::debug!("Activating ahead of first request");
        self.runtime()
            .get_or_activate(key)
            .await
            .map(|_| ())
            .map_err(Self::map_error)
    }

    /// Lifecycle state of the activation for `key`.
    fn activation_state(&self, key: &E::Key) -> ActorState {
        self.runtime().state(key)
    }

    /// Deactivate every entity and wait for them to stop.
    async fn shutdown(&self) {
        self.runtime().shutdown().await;
    }
}
