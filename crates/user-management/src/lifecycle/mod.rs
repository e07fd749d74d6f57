//! # System Lifecycle
//!
//! Wires the collaborators, the options and the User runtime together, and tears them
//! down again.
//!
//! ## The IdentitySystem Pattern
//!
//! [`IdentitySystem`] is the one place that knows which store, identity provider and
//! publisher back the actors:
//!
//! ```rust,ignore
//! let system = IdentitySystem::in_memory(UserManagementOptions::from_env()?);
//! system.store.insert(UserRecord::new(42, "ext-42"));
//!
//! let cancel = CancellationToken::new();
//! system.users.set_status(42, UserStatus::Banned, &cancel).await?;
//!
//! system.shutdown().await;
//! ```
//!
//! ## Graceful Shutdown
//!
//! 1. **Stop accepting work** - new sends fail with `ShuttingDown`
//! 2. **Finish the current turn** - each actor completes the request it is running
//! 3. **Reject the backlog** - queued requests are answered, never dropped silently
//! 4. **Await completion** - every actor task is joined before `shutdown` returns
//!
//! ## Observability
//!
//! [`setup_tracing`] installs the subscriber. Levels come from `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=info cargo run      # one line per operation outcome
//! RUST_LOG=debug cargo run     # pipeline steps and activation lifecycle
//! ```

pub mod identity_system;
pub mod telemetry;

pub use identity_system::*;
pub use telemetry::*;
