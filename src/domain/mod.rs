//! Domain models for the agrichain ledger
//!
//! Identifiers, roles, batches, user profiles and the events that move them.

mod batch;
mod event;
mod role;
mod types;
mod user;

pub use batch::*;
pub use event::*;
pub use role::*;
pub use types::*;
pub use user::*;
