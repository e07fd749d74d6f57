//! # Actor Runtime
//!
//! The directory of live activations and the entry point callers use to reach them.
//!
//! `ActorRuntime<E>` is the "Client" side of the Actor Model, generalized from one actor to
//! one actor *per key*. It keeps a concurrent map from key to `ActorHandle`; the first
//! message for a key spawns a `KeyedActor` task and every later message for that key is
//! routed into the same mailbox until the activation goes idle and leaves the map.
//!
//! ## Create-once
//! Handles are created inside `DashMap::entry`, which holds the shard lock for the key, so
//! concurrent first touches all observe the one handle the winner inserted.
//!
//! ## Eviction
//! Each message reserves a `MailboxSlot` on its handle while the entry lock is held and
//! releases it only when its turn is over. An idle actor removes itself with
//! `remove_if(depth == 0)` under the same lock, so no message is ever routed to a handle
//! that is leaving.

use crate::actor::{entity_type, KeyedActor};
use crate::config::RuntimeConfig;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::{Envelope, MailboxSlot, Response};
use crate::state::{ActorState, StateCell};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// A send that lands on a retired handle is re-routed to a fresh activation this many times.
const ROUTE_ATTEMPTS: usize = 2;

pub(crate) type Directory<E> = Arc<DashMap<<E as ActorEntity>::Key, ActorHandle<E>>>;

/// Identifies one activation of a key. A re-activation after eviction gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivationId(u64);

/// Directory entry for a live activation.
pub(crate) struct ActorHandle<E: ActorEntity> {
    pub generation: u64,
    sender: mpsc::Sender<Envelope<E>>,
    depth: Arc<AtomicUsize>,
    state: Arc<StateCell>,
}

impl<E: ActorEntity> ActorHandle<E> {
    /// Messages reserved against this handle whose turn has not finished yet.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

struct RuntimeInner<E: ActorEntity> {
    directory: Directory<E>,
    context: Arc<E::Context>,
    config: RuntimeConfig,
    next_generation: AtomicU64,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

/// Hosts every activation of entity type `E`.
///
/// Cheap to clone; all clones share the same directory.
pub struct ActorRuntime<E: ActorEntity> {
    inner: Arc<RuntimeInner<E>>,
}

impl<E: ActorEntity> Clone for ActorRuntime<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: ActorEntity> ActorRuntime<E> {
    /// Creates an empty runtime. `context` is shared by every activation.
    pub fn new(context: E::Context, config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                directory: Arc::new(DashMap::new()),
                context: Arc::new(context),
                config,
                next_generation: AtomicU64::new(1),
                shutdown: CancellationToken::new(),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// The shared context handed to every activation.
    pub fn context(&self) -> &E::Context {
        &self.inner.context
    }

    /// Resolves the activation for `key`, creating it if the key is inactive.
    ///
    /// Idempotent: concurrent callers for the same key get the same [`ActivationId`].
    pub async fn get_or_activate(&self, key: &E::Key) -> Result<ActivationId, FrameworkError> {
        let (_, _slot, id) = self.reserve(key)?;
        Ok(id)
    }

    /// Enqueues `request` on the mailbox for `key`.
    ///
    /// Waits for mailbox capacity unless `cancel` fires first. The reply, if any, travels
    /// through a channel carried inside the request.
    pub async fn send(
        &self,
        key: &E::Key,
        request: E::Request,
        cancel: &CancellationToken,
    ) -> Result<(), FrameworkError> {
        if cancel.is_cancelled() {
            return Err(FrameworkError::Cancelled);
        }

        let mut request = request;
        for _ in 0..ROUTE_ATTEMPTS {
            let (sender, slot, _) = self.reserve(key)?;
            let envelope = Envelope {
                request,
                cancel: cancel.clone(),
                slot,
            };

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FrameworkError::Cancelled),
                sent = sender.send(envelope) => sent,
            };
            match sent {
                Ok(()) => return Ok(()),
                // The handle was retired between reservation and send (failed activation).
                Err(mpsc::error::SendError(returned)) => request = returned.request,
            }
        }
        Err(self.closed_error())
    }

    /// Sends a request built around a fresh response channel and waits for the reply.
    ///
    /// Returns once the message has had its turn (or was rejected).
    pub async fn call<T, F>(
        &self,
        key: &E::Key,
        cancel: &CancellationToken,
        make_request: F,
    ) -> Result<T, E::Error>
    where
        F: FnOnce(Response<T, E::Error>) -> E::Request,
    {
        let (respond_to, response) = oneshot::channel();
        self.send(key, make_request(respond_to), cancel).await?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    /// Lifecycle state of `key`. Keys without a live handle are `Inactive`.
    pub fn state(&self, key: &E::Key) -> ActorState {
        self.inner
            .directory
            .get(key)
            .map(|handle| handle.state.get())
            .unwrap_or(ActorState::Inactive)
    }

    /// Number of keys that currently have a live handle.
    pub fn active_count(&self) -> usize {
        self.inner.directory.len()
    }

    /// Deactivates every actor and waits for their tasks to finish.
    ///
    /// Messages still queued are rejected with [`FrameworkError::ShuttingDown`], as are
    /// any sends that arrive afterwards.
    pub async fn shutdown(&self) {
        info!(
            entity_type = entity_type::<E>(),
            active = self.active_count(),
            "Shutting down runtime"
        );
        self.inner.shutdown.cancel();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        info!(entity_type = entity_type::<E>(), "Runtime stopped");
    }

    /// Takes a slot on the handle for `key`, activating it first if needed.
    fn reserve(
        &self,
        key: &E::Key,
    ) -> Result<(mpsc::Sender<Envelope<E>>, MailboxSlot, ActivationId), FrameworkError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(FrameworkError::ShuttingDown);
        }
        let handle = self
            .inner
            .directory
            .entry(key.clone())
            .or_insert_with(|| self.spawn_actor(key.clone()));
        let slot = MailboxSlot::reserve(&handle.depth);
        Ok((handle.sender.clone(), slot, ActivationId(handle.generation)))
    }

    fn spawn_actor(&self, key: E::Key) -> ActorHandle<E> {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::channel(self.inner.config.mailbox_capacity.max(1));
        let state = Arc::new(StateCell::new(ActorState::Activating));
        debug!(entity_type = entity_type::<E>(), %key, generation, "Spawning actor");

        let actor = KeyedActor::new(
            key,
            generation,
            receiver,
            Arc::clone(&state),
            Arc::clone(&self.inner.directory),
            Arc::clone(&self.inner.context),
            &self.inner.config,
            self.inner.shutdown.child_token(),
        );
        self.inner.tasks.spawn(actor.run());

        ActorHandle {
            generation,
            sender,
            depth: Arc::new(AtomicUsize::new(0)),
            state,
        }
    }

    fn closed_error(&self) -> FrameworkError {
        if self.inner.shutdown.is_cancelled() {
            FrameworkError::ShuttingDown
        } else {
            FrameworkError::ActorClosed
        }
    }
}
