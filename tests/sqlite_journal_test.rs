//! Durability tests for the SQLite journal.
//!
//! Each test uses a database file in a temporary directory so reopening
//! exercises a real replay.

mod common;

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use agrichain_ledger::domain::{
    Address, BatchId, BatchStatus, LedgerEvent, NewJournalEntry, QualityCheckRequest, Role,
    TransferRequest,
};
use agrichain_ledger::infra::{Journal, SqliteJournal};
use agrichain_ledger::ledger::Ledger;
use agrichain_ledger::metrics::MetricsRegistry;
use agrichain_ledger::LedgerError;

use common::*;

fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("journal.db").display())
}

async fn open_journal(url: &str) -> Arc<dyn Journal> {
    Arc::new(SqliteJournal::connect(url).await.unwrap())
}

#[tokio::test]
async fn test_replay_reproduces_state() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);
    let people = Participants::random();
    let batch_id = BatchId::from("BATCH_1");

    let before = {
        let ledger = ledger_with(open_journal(&url).await, &people).await;
        ledger
            .register_batch(people.farmer, registration("BATCH_1"))
            .await
            .unwrap();
        ledger
            .transfer_batch(
                people.farmer,
                &batch_id,
                TransferRequest {
                    to: people.distributor,
                    new_price: 120,
                    location: "Depot".to_string(),
                    notes: "chilled".to_string(),
                },
            )
            .await
            .unwrap();
        ledger
            .update_batch_status(people.distributor, &batch_id, BatchStatus::InTransit)
            .await
            .unwrap();
        ledger
            .add_quality_check(
                people.regulator,
                &batch_id,
                QualityCheckRequest {
                    score: 92,
                    notes: String::new(),
                    report_hash: String::new(),
                },
            )
            .await
            .unwrap();
        ledger
            .register_user(people.farmer, user_registration("Alice", Role::Farmer))
            .await
            .unwrap();
        ledger
            .deactivate_user(people.admin, people.farmer)
            .await
            .unwrap();
        ledger.snapshot().await
    };

    // Reopen without an admin: the journal already carries one
    let reopened = Ledger::open(
        open_journal(&url).await,
        None,
        Arc::new(MetricsRegistry::new()),
    )
    .await
    .unwrap();

    assert_eq!(reopened.snapshot().await, before);
    assert_eq!(
        reopened.get_batch_history(&batch_id).await.unwrap().len(),
        4
    );
    assert!(!reopened.is_active_user(&people.farmer).await);
    assert!(reopened.has_role(Role::Admin, &people.admin).await);
}

#[tokio::test]
async fn test_writes_continue_after_reopen() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);
    let people = Participants::random();

    {
        let ledger = ledger_with(open_journal(&url).await, &people).await;
        ledger
            .register_batch(people.farmer, registration("B-1"))
            .await
            .unwrap();
    }

    let journal = open_journal(&url).await;
    let head = journal.head().await.unwrap();
    let ledger = Ledger::open(journal.clone(), None, Arc::new(MetricsRegistry::new()))
        .await
        .unwrap();

    ledger
        .register_batch(people.farmer, registration("B-2"))
        .await
        .unwrap();
    assert_eq!(journal.head().await.unwrap(), head + 1);
    assert_eq!(ledger.get_all_batch_ids().await.len(), 2);

    let err = ledger
        .register_batch(people.farmer, registration("B-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyExists(_)));
    assert_eq!(journal.head().await.unwrap(), head + 1);
}

#[tokio::test]
async fn test_empty_journal_requires_admin() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);

    let result = Ledger::open(open_journal(&url).await, None, Arc::new(MetricsRegistry::new())).await;
    assert!(matches!(result, Err(LedgerError::Configuration(_))));
    assert_eq!(open_journal(&url).await.head().await.unwrap(), 0);
}

#[tokio::test]
async fn test_rewritten_actor_is_detected_on_reopen() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);
    let people = Participants::random();

    {
        let ledger = ledger_with(open_journal(&url).await, &people).await;
        ledger
            .register_batch(people.farmer, registration("B-OWNED"))
            .await
            .unwrap();
    }

    // Attribute the registration to someone else directly in the table
    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    let updated = sqlx::query("UPDATE ledger_journal SET actor = ? WHERE event_type = ?")
        .bind(people.consumer.to_string())
        .bind(LedgerEvent::BATCH_REGISTERED)
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(updated.rows_affected(), 1);
    pool.close().await;

    let result = Ledger::open(open_journal(&url).await, None, Arc::new(MetricsRegistry::new())).await;
    assert!(
        matches!(result, Err(LedgerError::JournalCorrupted { .. })),
        "{:?}",
        result.err()
    );
}

#[tokio::test]
async fn test_concurrent_writers_share_one_sequence() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);
    let first = open_journal(&url).await;
    let second = open_journal(&url).await;
    let actor = Address::random();

    let write = move |journal: Arc<dyn Journal>| async move {
        for _ in 0..20 {
            journal
                .append(NewJournalEntry::new(actor, Utc::now(), LedgerEvent::Paused))
                .await
                .unwrap();
        }
    };
    tokio::join!(write(first.clone()), write(second.clone()));

    let entries = first.read_from(1).await.unwrap();
    let sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (1..=40).collect::<Vec<u64>>());
    assert!(entries.iter().all(|e| e.verify_payload_hash()));
    assert_eq!(second.head().await.unwrap(), 40);
}
