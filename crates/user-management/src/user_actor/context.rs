//! Dependencies shared by every user activation.

use crate::config::UserManagementOptions;
use crate::gateways::{EventPublisher, IdentityProvider, UserStore};
use crate::outcome::Outcome;
use crate::user_actor::UserError;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The collaborators and options a [`UserActor`](super::UserActor) works with.
///
/// Cheap to clone: every field is behind an `Arc`.
#[derive(Clone)]
pub struct UserContext {
    pub store: Arc<dyn UserStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub events: Arc<dyn EventPublisher>,
    pub options: Arc<UserManagementOptions>,
}

impl UserContext {
    pub fn new(
        store: Arc<dyn UserStore>,
        identity: Arc<dyn IdentityProvider>,
        events: Arc<dyn EventPublisher>,
        options: UserManagementOptions,
    ) -> Self {
        Self {
            store,
            identity,
            events,
            options: Arc::new(options),
        }
    }

    /// Runs one collaborator call, bounded by the caller's token and the collaborator timeout.
    ///
    /// On cancellation or timeout the call's future is dropped where it stands.
    pub(crate) async fn guarded<T, F>(
        &self,
        cancel: &CancellationToken,
        operation: &'static str,
        call: F,
    ) -> Outcome<T>
    where
        F: Future<Output = Outcome<T>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(UserError::Cancelled(operation.to_string())),
            result = tokio::time::timeout(self.options.collaborator_timeout, call) => match result {
                Ok(outcome) => outcome,
                Err(_) => Err(UserError::Timeout(operation.to_string())),
            },
        }
    }
}
