//! Lifecycle state of a single activation.

use std::sync::atomic::{AtomicU8, Ordering};

/// Where an activation is in its lifecycle.
///
/// A key that has no handle in the directory is `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    Inactive,
    Activating,
    Active,
    Deactivating,
}

impl ActorState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Inactive => 0,
            Self::Activating => 1,
            Self::Active => 2,
            Self::Deactivating => 3,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Activating,
            2 => Self::Active,
            3 => Self::Deactivating,
            _ => Self::Inactive,
        }
    }
}

/// Shared, lock-free cell read by the directory and written by the actor task.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: ActorState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub fn get(&self) -> ActorState {
        ActorState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: ActorState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }
}
