use crate::clients::UserManagementClient;
use crate::config::UserManagementOptions;
use crate::gateways::{BroadcastEventPublisher, InMemoryIdentityProvider, InMemoryUserStore};
use crate::user_actor::{self, UserContext};
use actor_runtime::ActorClient;
use std::sync::Arc;
use tracing::info;

/// Capacity of the in-process event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The running user-management system.
///
/// Holds the client callers talk to plus the in-memory collaborators behind it, so a
/// host (or a test) can seed users and observe claims and events directly.
pub struct IdentitySystem {
    /// Client for the User actors.
    pub users: UserManagementClient,

    pub store: Arc<InMemoryUserStore>,

    pub identity: Arc<InMemoryIdentityProvider>,

    /// Subscribe here to receive every published event as a CloudEvent.
    pub events: Arc<BroadcastEventPublisher>,
}

impl IdentitySystem {
    /// Builds the system over in-memory collaborators.
    pub fn in_memory(options: UserManagementOptions) -> Self {
        let store = Arc::new(InMemoryUserStore::new());
        let identity = Arc::new(InMemoryIdentityProvider::new());
        let events = Arc::new(BroadcastEventPublisher::new(
            options.event_source.clone(),
            EVENT_CHANNEL_CAPACITY,
        ));

        info!(
            idle_timeout = ?options.runtime.idle_timeout,
            mailbox_capacity = options.runtime.mailbox_capacity,
            provider_sync = !options.disable_provider_sync,
            "Starting user management"
        );

        let ctx = UserContext::new(store.clone(), identity.clone(), events.clone(), options);
        let users = user_actor::new(ctx);

        Self {
            users,
            store,
            identity,
            events,
        }
    }

    /// Deactivates every user actor and waits for them to stop.
    pub async fn shutdown(&self) {
        info!("Shutting down user management");
        self.users.shutdown().await;
        info!("User management stopped");
    }
}
