//! Runtime tuning knobs.

use std::time::Duration;

/// Default mailbox capacity per key.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// Default idle window before an activation is evicted.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration shared by every activation of an [`ActorRuntime`](crate::ActorRuntime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Capacity of each key's mailbox. When full, senders wait for space.
    pub mailbox_capacity: usize,

    /// How long an activation may sit with an empty mailbox before it is deactivated.
    pub idle_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl RuntimeConfig {
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_mailbox_capacity(mut self, mailbox_capacity: usize) -> Self {
        // tokio's bounded channel panics on zero capacity
        self.mailbox_capacity = mailbox_capacity.max(1);
        self
    }
}
