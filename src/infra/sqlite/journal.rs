//! SQLite-backed ledger journal
//!
//! Each entry is one row keyed by its sequence number. The event is stored
//! as JSON next to a SHA-256 hash over the full envelope (sequence, entry id,
//! actor, timestamp and event), so replay rejects a row with any of those
//! columns rewritten.
//!
//! Appends take SQLite's write lock up front (`BEGIN IMMEDIATE`), so two
//! processes appending to the same file serialize on the lock instead of
//! racing for the next sequence number.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{Address, JournalEntry, LedgerEvent, NewJournalEntry};
use crate::infra::{Journal, LedgerError, Result};

/// SQLite journal
pub struct SqliteJournal {
    pool: SqlitePool,
}

impl SqliteJournal {
    /// Open (creating if missing) the database at `url` and run migrations
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // An in-memory database exists per connection
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let journal = Self { pool };
        journal.initialize().await?;
        Ok(journal)
    }

    async fn initialize(&self) -> Result<()> {
        crate::migrations::run_sqlite(&self.pool)
            .await
            .map_err(|e| LedgerError::Configuration(format!("journal migration failed: {e}")))
    }
}

/// Assign the next sequence and insert the row.
///
/// The caller must hold the database write lock.
async fn insert_next(conn: &mut SqliteConnection, entry: NewJournalEntry) -> Result<JournalEntry> {
    let (head,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(sequence), 0) FROM ledger_journal")
        .fetch_one(&mut *conn)
        .await?;
    let entry = entry.into_entry(head as u64 + 1);
    let payload_json = serde_json::to_string(&entry.event)?;

    sqlx::query(
        r#"
        INSERT INTO ledger_journal (
            sequence, entry_id, actor, event_type, batch_id,
            payload, payload_hash, recorded_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.sequence as i64)
    .bind(entry.entry_id.to_string())
    .bind(entry.actor.to_string())
    .bind(entry.event.event_type())
    .bind(entry.event.batch_id().map(|id| id.as_str().to_string()))
    .bind(&payload_json)
    .bind(hex::encode(entry.payload_hash))
    .bind(entry.recorded_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(entry)
}

/// Append inside a `BEGIN IMMEDIATE` transaction
async fn append_immediate(pool: SqlitePool, entry: NewJournalEntry) -> Result<JournalEntry> {
    let mut conn = pool.acquire().await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

    match insert_next(&mut conn, entry).await {
        Ok(entry) => match sqlx::query("COMMIT").execute(&mut *conn).await {
            Ok(_) => Ok(entry),
            Err(e) => {
                rollback(&mut conn).await;
                Err(e.into())
            }
        },
        Err(e) => {
            rollback(&mut conn).await;
            Err(e)
        }
    }
}

async fn rollback(conn: &mut SqliteConnection) {
    if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        warn!(error = %e, "journal rollback failed");
    }
}

#[async_trait]
impl Journal for SqliteJournal {
    async fn append(&self, entry: NewJournalEntry) -> Result<JournalEntry> {
        // Detached so a dropped caller never returns a connection to the
        // pool with the write transaction still open
        tokio::spawn(append_immediate(self.pool.clone(), entry))
            .await
            .map_err(|e| LedgerError::Internal(format!("journal append task failed: {e}")))?
    }

    async fn read_from(&self, from: u64) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query_as::<_, JournalRow>(
            r#"
            SELECT sequence, entry_id, actor, payload, payload_hash, recorded_at
            FROM ledger_journal
            WHERE sequence >= ?
            ORDER BY sequence ASC
            "#,
        )
        .bind(from as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JournalEntry::try_from).collect()
    }

    async fn head(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(sequence), 0) FROM ledger_journal")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

/// Raw row from the journal table
#[derive(Debug, FromRow)]
struct JournalRow {
    sequence: i64,
    entry_id: String,
    actor: String,
    payload: String,
    payload_hash: String,
    recorded_at: String,
}

impl TryFrom<JournalRow> for JournalEntry {
    type Error = LedgerError;

    fn try_from(row: JournalRow) -> Result<Self> {
        let sequence = row.sequence as u64;
        let corrupted = |reason: String| LedgerError::JournalCorrupted { sequence, reason };

        let entry_id = Uuid::parse_str(&row.entry_id)
            .map_err(|e| corrupted(format!("invalid entry_id: {e}")))?;
        let actor = Address::from_str(&row.actor)
            .map_err(|e| corrupted(format!("invalid actor: {e}")))?;
        let event: LedgerEvent = serde_json::from_str(&row.payload)
            .map_err(|e| corrupted(format!("invalid payload: {e}")))?;
        let payload_hash: [u8; 32] = hex::decode(&row.payload_hash)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| corrupted("invalid payload_hash".to_string()))?;
        let recorded_at = DateTime::parse_from_rfc3339(&row.recorded_at)
            .map_err(|e| corrupted(format!("invalid recorded_at: {e}")))?
            .with_timezone(&Utc);

        Ok(JournalEntry {
            sequence,
            entry_id,
            actor,
            recorded_at,
            event,
            payload_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BatchId;

    async fn memory_journal() -> SqliteJournal {
        SqliteJournal::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_append_assigns_sequences() {
        let journal = memory_journal().await;
        let actor = Address::random();

        let first = journal
            .append(NewJournalEntry::new(actor, Utc::now(), LedgerEvent::Paused))
            .await
            .unwrap();
        let second = journal
            .append(NewJournalEntry::new(actor, Utc::now(), LedgerEvent::Unpaused))
            .await
            .unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(journal.head().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_read_back_matches_appended() {
        let journal = memory_journal().await;
        let appended = journal
            .append(NewJournalEntry::new(
                Address::random(),
                Utc::now(),
                LedgerEvent::PriceUpdated {
                    batch_id: BatchId::from("BATCH_1"),
                    old_price: 100,
                    new_price: 150,
                },
            ))
            .await
            .unwrap();

        let entries = journal.read_from(1).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], appended);
        assert!(entries[0].verify_payload_hash());
    }

    #[tokio::test]
    async fn test_tampered_row_fails_hash_check() {
        let journal = memory_journal().await;
        journal
            .append(NewJournalEntry::new(
                Address::random(),
                Utc::now(),
                LedgerEvent::Paused,
            ))
            .await
            .unwrap();

        sqlx::query("UPDATE ledger_journal SET payload = ? WHERE sequence = 1")
            .bind(r#"{"type":"unpaused"}"#)
            .execute(&journal.pool)
            .await
            .unwrap();

        let entries = journal.read_from(1).await.unwrap();
        assert!(!entries[0].verify_payload_hash());
    }
}
