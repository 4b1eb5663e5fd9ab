//! Infrastructure layer for the agrichain ledger
//!
//! Contains the journal trait and its implementations:
//! - In-memory journal (tests, ephemeral runs)
//! - SQLite journal (durable storage)

mod error;
mod memory;
pub mod sqlite;
mod traits;

pub use error::*;
pub use memory::MemoryJournal;
pub use sqlite::SqliteJournal;
pub use traits::*;
