//! API layer for the agrichain ledger
//!
//! REST endpoints over the batch ledger and user registry, plus the
//! structured error format shared with the auth middleware.

mod error;
pub mod handlers;
mod rest;
mod types;
mod utils;

pub use error::*;
pub use rest::*;
pub use types::*;
pub use utils::*;
