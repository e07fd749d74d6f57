//! # External Collaborators
//!
//! The three systems a user actor coordinates, each behind a trait so the actor only ever
//! holds `Arc<dyn Trait>` handles:
//!
//! - [`UserStore`] - durable records; failures abort the operation
//! - [`IdentityProvider`] - claims and tokens; failures abort the operation
//! - [`EventPublisher`] - notifications; failures are logged and swallowed
//!
//! Each trait ships with a process-local implementation used by the binary and the tests.

pub mod events;
pub mod identity;
pub mod store;

pub use events::*;
pub use identity::*;
pub use store::*;
