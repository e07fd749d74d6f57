//! # Keyed Actor Task
//!
//! This module defines `KeyedActor`, the task that owns one activation of an entity.
//! It implements the "Server" side of the Actor Model for a single key: it activates the
//! entity, then processes mailbox messages strictly one at a time until it goes idle, the
//! runtime shuts down, or activation fails.
//!
//! **Concurrency Model**:
//! There is exactly one `KeyedActor` per live key. It owns the entity (and therefore the
//! entity's cache) and the receiving end of the mailbox, so a turn can mutate state with
//! plain `&mut` access. Different keys run on different tasks and make progress in parallel
//! on tokio's worker pool.

use crate::config::RuntimeConfig;
use crate::entity::{ActorEntity, DeactivationReason};
use crate::error::FrameworkError;
use crate::message::Envelope;
use crate::runtime::Directory;
use crate::state::{ActorState, StateCell};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Short type name used as the `entity_type` log field (e.g., "UserActor").
pub(crate) fn entity_type<E>() -> &'static str {
    std::any::type_name::<E>()
        .split("::")
        .last()
        .unwrap_or("Unknown")
}

/// The task that hosts one activation.
pub(crate) struct KeyedActor<E: ActorEntity> {
    key: E::Key,
    generation: u64,
    receiver: mpsc::Receiver<Envelope<E>>,
    state: Arc<StateCell>,
    directory: Directory<E>,
    context: Arc<E::Context>,
    idle_timeout: Duration,
    shutdown: CancellationToken,
}

impl<E: ActorEntity> KeyedActor<E> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: E::Key,
        generation: u64,
        receiver: mpsc::Receiver<Envelope<E>>,
        state: Arc<StateCell>,
        directory: Directory<E>,
        context: Arc<E::Context>,
        config: &RuntimeConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            key,
            generation,
            receiver,
            state,
            directory,
            context,
            idle_timeout: config.idle_timeout,
            shutdown,
        }
    }

    /// Activates the entity and runs its turn loop.
    pub async fn run(mut self) {
        let entity_type = entity_type::<E>();
        let key = self.key.clone();
        self.state.set(ActorState::Activating);
        debug!(entity_type, %key, generation = self.generation, "Activating");

        if self.shutdown.is_cancelled() {
            self.retire();
            self.reject_queued(FrameworkError::ShuttingDown);
            self.state.set(ActorState::Inactive);
            return;
        }

        let mut entity = match E::activate(&key, &self.context).await {
            Ok(entity) => entity,
            Err(e) => {
                warn!(entity_type, %key, error = %e, "Activation failed");
                // Leave the directory first so new requests get a fresh handle.
                self.retire();
                self.reject_queued(FrameworkError::ActivationFailed(e.to_string()));
                self.state.set(ActorState::Inactive);
                let reason = DeactivationReason::ActivationFailed;
                info!(entity_type, %key, ?reason, "Deactivated");
                return;
            }
        };
        self.state.set(ActorState::Active);
        info!(entity_type, %key, "Activated");

        let reason = loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break DeactivationReason::Shutdown,
                next = tokio::time::timeout(self.idle_timeout, self.receiver.recv()) => match next {
                    Ok(Some(envelope)) => self.turn(&mut entity, envelope).await,
                    Ok(None) => break DeactivationReason::Shutdown,
                    Err(_) => {
                        if self.try_retire_idle() {
                            break DeactivationReason::IdleTimeout;
                        }
                        debug!(entity_type, %key, "Idle window elapsed with messages in flight");
                    }
                },
            }
        };

        self.state.set(ActorState::Deactivating);
        if reason == DeactivationReason::Shutdown {
            self.retire();
            self.reject_queued(FrameworkError::ShuttingDown);
        }
        entity.on_deactivate(reason, &self.context).await;
        self.state.set(ActorState::Inactive);
        info!(entity_type, %key, ?reason, "Deactivated");
    }

    async fn turn(&self, entity: &mut E, envelope: Envelope<E>) {
        let Envelope {
            request,
            cancel,
            slot,
        } = envelope;

        if cancel.is_cancelled() {
            debug!(entity_type = entity_type::<E>(), key = %self.key, "Skipping cancelled request");
            E::reject(request, FrameworkError::Cancelled);
        } else {
            debug!(entity_type = entity_type::<E>(), key = %self.key, ?request, "Turn");
            entity.handle(request, &self.context, &cancel).await;
        }

        // The handle stays pinned until the turn is fully over.
        drop(slot);
    }

    /// Removes this activation from the directory if nothing is queued or reserved.
    fn try_retire_idle(&self) -> bool {
        self.directory
            .remove_if(&self.key, |_, handle| {
                handle.generation == self.generation && handle.depth() == 0
            })
            .is_some()
    }

    /// Removes this activation from the directory unconditionally.
    fn retire(&self) {
        self.directory
            .remove_if(&self.key, |_, handle| handle.generation == self.generation);
    }

    /// Closes the mailbox and rejects everything still in it.
    fn reject_queued(&mut self, error: FrameworkError) {
        self.receiver.close();
        while let Ok(envelope) = self.receiver.try_recv() {
            E::reject(envelope.request, error.clone());
        }
    }
}

impl<E: ActorEntity> Drop for KeyedActor<E> {
    fn drop(&mut self) {
        // Covers a panicking turn: the key must not stay bound to a dead mailbox.
        self.retire();
    }
}
