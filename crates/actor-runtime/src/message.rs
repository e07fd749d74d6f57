//! # Mailbox Messages
//!
//! What travels through a key's mailbox: the entity's request, the caller's cancellation
//! token and a slot that keeps the handle alive until the turn completes.

use crate::entity::ActorEntity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Type alias for the one-shot response channel carried inside entity requests.
pub type Response<T, E> = oneshot::Sender<Result<T, E>>;

/// One queued request plus the bookkeeping the runtime needs around it.
pub(crate) struct Envelope<E: ActorEntity> {
    pub request: E::Request,
    pub cancel: CancellationToken,
    pub slot: MailboxSlot,
}

/// Counts one message against its handle from reservation until its turn is over.
///
/// A handle is only evicted while its count is zero, and reservations are taken under the
/// directory entry lock, so a message can never be routed to a handle that is going away.
#[derive(Debug)]
pub(crate) struct MailboxSlot {
    depth: Arc<AtomicUsize>,
}

impl MailboxSlot {
    pub fn reserve(depth: &Arc<AtomicUsize>) -> Self {
        depth.fetch_add(1, Ordering::SeqCst);
        Self {
            depth: Arc::clone(depth),
        }
    }
}

impl Drop for MailboxSlot {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_counts_until_dropped() {
        let depth = Arc::new(AtomicUsize::new(0));
        let first = MailboxSlot::reserve(&depth);
        let second = MailboxSlot::reserve(&depth);
        assert_eq!(depth.load(Ordering::SeqCst), 2);

        drop(first);
        assert_eq!(depth.load(Ordering::SeqCst), 1);
        drop(second);
        assert_eq!(depth.load(Ordering::SeqCst), 0);
    }
}
