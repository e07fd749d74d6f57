//! # User Management
//!
//! Per-user actors that own the moderation status and roles of one user each, built on
//! the [`actor_runtime`] crate.
//!
//! ## Core Components
//!
//! - **[user_actor]**: The [`UserActor`](user_actor::UserActor) entity and its pipelines.
//! - **[clients]**: [`UserManagementClient`](clients::UserManagementClient), the typed API callers use.
//! - **[gateways]**: The store, identity provider and event publisher the actors talk to.
//! - **[model]**: Records, statuses and domain events.
//! - **[outcome]**: Operation results, stable error codes and the step pipeline.
//! - **[config]**: Options, loadable from the environment.
//! - **[lifecycle]**: Wiring, shutdown and tracing setup.
//!
//! ## Testing
//!
//! See [`mock`] for collaborators with failure injection, gates and a call journal.

pub mod clients;
pub mod config;
pub mod gateways;
pub mod lifecycle;
pub mod mock;
pub mod model;
pub mod outcome;
pub mod user_actor;
