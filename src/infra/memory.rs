//! In-memory journal for tests and ephemeral deployments

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{JournalEntry, NewJournalEntry};

use super::{Journal, Result};

/// Journal kept entirely in process memory
#[derive(Default)]
pub struct MemoryJournal {
    entries: RwLock<Vec<JournalEntry>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Journal for MemoryJournal {
    async fn append(&self, entry: NewJournalEntry) -> Result<JournalEntry> {
        let mut entries = self.entries.write().await;
        let sequence = entries.len() as u64 + 1;
        let entry = entry.into_entry(sequence);
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn read_from(&self, from: u64) -> Result<Vec<JournalEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.sequence >= from)
            .cloned()
            .collect())
    }

    async fn head(&self) -> Result<u64> {
        Ok(self.entries.read().await.len() as u64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, LedgerEvent};
    use chrono::Utc;

    #[tokio::test]
    async fn test_sequences_are_gap_free() {
        let journal = MemoryJournal::new();
        let actor = Address::random();

        for _ in 0..3 {
            journal
                .append(NewJournalEntry::new(actor, Utc::now(), LedgerEvent::Paused))
                .await
                .unwrap();
        }

        assert_eq!(journal.head().await.unwrap(), 3);
        let tail = journal.read_from(2).await.unwrap();
        let seqs: Vec<u64> = tail.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![2, 3]);
    }
}
