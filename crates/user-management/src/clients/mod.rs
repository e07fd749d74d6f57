//! # Clients
//!
//! Typed facades over the actor runtime. Callers use these instead of building
//! [`UserCommand`](crate::user_actor::UserCommand)s and reply channels by hand.

pub mod user_client;

pub use user_client::*;
