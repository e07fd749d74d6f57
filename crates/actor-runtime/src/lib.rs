//! # Actor Runtime
//!
//! This crate provides a keyed, virtual-actor style runtime on top of tokio: one actor per
//! entity key, created lazily on the first message for that key, fed strictly one message at
//! a time, and torn down again after an idle period.
//!
//! ## Why keyed actors?
//!
//! Many services mutate per-entity state (one user, one account, one device) from many
//! concurrent callers. Serializing every operation for a given key through a single task
//! makes each operation atomic with respect to the others for that key, without locks and
//! without any coordination between *different* keys.
//!
//! - Isolated state (the entity is owned by its task; `handle` gets `&mut self`)
//! - Message-passing concurrency
//! - Sequential processing per key, full parallelism across keys
//!
//! **Further Reading**:
//! - [Actor Model (Wikipedia)](https://en.wikipedia.org/wiki/Actor_model) - Foundational concurrency pattern by Carl Hewitt
//! - [Actors in Rust](https://ryhl.io/blog/actors-with-tokio/) - Practical guide to implementing actors with Tokio
//!
//! ## Architecture Overview
//!
//! 1. **Entity Layer** ([`ActorEntity`]) - Your business logic, one instance per key
//! 2. **Runtime Layer** ([`ActorRuntime`]) - Directory, activation, mailboxes and idle eviction
//! 3. **Interface Layer** ([`ActorClient`]) - Typed facades over the runtime
//!
//! ## Lifecycle
//!
//! ```text
//! Inactive --first message--> Activating --activate() ok--> Active
//!    ^                             |                          |
//!    |<----- activate() failed ----+        idle window / shutdown
//!    |                                                        v
//!    +<------------------- on_deactivate() ------------- Deactivating
//! ```
//!
//! A failed activation rejects the queued messages with
//! [`FrameworkError::ActivationFailed`] and leaves the key `Inactive`, so the next message
//! retries activation from scratch.
//!
//! ## Example
//!
//! ```rust
//! use actor_runtime::{ActorEntity, ActorRuntime, FrameworkError, Response, RuntimeConfig};
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug, thiserror::Error)]
//! enum CounterError {
//!     #[error(transparent)]
//!     Runtime(#[from] FrameworkError),
//! }
//!
//! #[derive(Debug)]
//! enum CounterRequest {
//!     Increment { respond_to: Response<u64, CounterError> },
//! }
//!
//! struct Counter {
//!     value: u64,
//! }
//!
//! #[async_trait]
//! impl ActorEntity for Counter {
//!     type Key = String;
//!     type Request = CounterRequest;
//!     type Context = ();
//!     type Error = CounterError;
//!
//!     async fn activate(_key: &String, _ctx: &()) -> Result<Self, CounterError> {
//!         Ok(Self { value: 0 })
//!     }
//!
//!     async fn handle(
//!         &mut self,
//!         request: CounterRequest,
//!         _ctx: &(),
//!         _cancel: &CancellationToken,
//!     ) {
//!         match request {
//!             CounterRequest::Increment { respond_to } => {
//!                 self.value += 1;
//!                 let _ = respond_to.send(Ok(self.value));
//!             }
//!         }
//!     }
//!
//!     fn reject(request: CounterRequest, error: FrameworkError) {
//!         match request {
//!             CounterRequest::Increment { respond_to } => {
//!                 let _ = respond_to.send(Err(error.into()));
//!             }
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let runtime = ActorRuntime::<Counter>::new((), RuntimeConfig::default());
//!     let cancel = CancellationToken::new();
//!     let key = "clicks".to_string();
//!
//!     let first = runtime
//!         .call(&key, &cancel, |respond_to| CounterRequest::Increment { respond_to })
//!         .await
//!         .unwrap();
//!     let second = runtime
//!         .call(&key, &cancel, |respond_to| CounterRequest::Increment { respond_to })
//!         .await
//!         .unwrap();
//!     assert_eq!((first, second), (1, 2));
//!
//!     runtime.shutdown().await;
//! }
//! ```
//!
//! ## Context Injection
//!
//! Dependencies every activation needs (storage gateways, options) live in
//! [`ActorEntity::Context`]. The runtime owns one instance, created at construction, and
//! lends it to `activate`, `handle` and `on_deactivate`.
//!
//! ## Cancellation
//!
//! Every request carries a [`CancellationToken`](tokio_util::sync::CancellationToken).
//! A request whose token fires while it is still queued never reaches `handle`; it is
//! rejected with [`FrameworkError::Cancelled`]. Once its turn has started the token is
//! passed to `handle`, which decides how to honour it.

mod actor;
pub mod client_trait;
pub mod config;
pub mod entity;
pub mod error;
pub mod message;
pub mod runtime;
pub mod state;

// Re-export core types for convenience
pub use client_trait::ActorClient;
pub use config::RuntimeConfig;
pub use entity::{ActorEntity, DeactivationReason};
pub use error::FrameworkError;
pub use message::Response;
pub use runtime::{ActivationId, ActorRuntime};
pub use state::ActorState;
