//! Storage seam for the ledger journal

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{JournalEntry, NewJournalEntry};

use super::Result;

/// Append-only, totally ordered log of ledger events.
///
/// The journal is the source of truth: replaying [`Journal::read_from`]
/// with sequence 1 must reproduce the ledger state exactly.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Journal: Send + Sync {
    /// Durably append one entry and return it with its assigned sequence.
    ///
    /// Sequences start at 1 and have no gaps. An error means nothing was
    /// written.
    async fn append(&self, entry: NewJournalEntry) -> Result<JournalEntry>;

    /// Read entries with `sequence >= from`, in sequence order
    async fn read_from(&self, from: u64) -> Result<Vec<JournalEntry>>;

    /// Highest assigned sequence, 0 for an empty journal
    async fn head(&self) -> Result<u64>;

    /// Backend name for logs and readiness output
    fn backend(&self) -> &'static str;
}
