//! Agrichain Ledger Library
//!
//! Role-gated batch lifecycle ledger and user registry for agricultural
//! supply chains. Every accepted write becomes an entry in an append-only
//! journal; the in-memory state is a replay of that journal.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (batches, roles, users, journal entries)
//! - [`ledger`] - Lifecycle rules and the single-writer [`Ledger`] service
//! - [`access`] - Role table, API keys and the auth middleware
//! - [`infra`] - Journal backends (SQLite, in-memory) and errors
//! - [`metrics`] - Counters, gauges and latency histograms
//! - [`api`] - REST API routes
//! - [`server`] - Configuration and HTTP bootstrap

pub mod access;
pub mod api;
pub mod domain;
pub mod infra;
pub mod ledger;
pub mod metrics;
pub mod migrations;
pub mod server;

// Re-export commonly used types
pub use domain::{
    Address, Batch, BatchId, BatchRegistration, BatchStatus, JournalEntry, LedgerEvent, Price,
    QualityCheck, Role, RoleId, TransferRecord, UserProfile, UserRegistration,
};

pub use infra::{Journal, LedgerError, MemoryJournal, Result, SqliteJournal};
pub use ledger::{Ledger, LedgerState, LedgerSummary};
