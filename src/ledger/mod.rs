//! Batch lifecycle ledger and user registry
//!
//! [`LedgerState`] is the projection of the journal. Validation methods on
//! it turn a request into at most one [`LedgerEvent`](crate::domain::LedgerEvent);
//! [`Ledger`] serializes writers, journals the event and applies it.

mod admin;
mod batches;
mod service;
mod state;
mod users;

pub use service::Ledger;
pub use state::{LedgerState, LedgerSummary};
