//! Pure data types shared by the actor, the gateways and the facade.

pub mod events;
pub mod user;

pub use events::*;
pub use user::*;
