//! Single-writer ledger service
//!
//! Every write runs validate, journal append and apply while holding the
//! state write lock, so writes are serialized and a failure at any step
//! before apply leaves the state untouched.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::{LedgerState, LedgerSummary};
use crate::access::RoleMembers;
use crate::domain::{
    Address, Batch, BatchId, BatchRegistration, BatchStatus, JournalEntry, LedgerEvent,
    NewJournalEntry, Price, ProfileUpdate, QualityCheck, QualityCheckRequest, Role, RoleId,
    TransferRecord, TransferRequest, UserProfile, UserRegistration,
};
use crate::infra::{Journal, LedgerError, Result};
use crate::metrics::{metric_names, timed, MetricsRegistry};

/// Event-sourced batch ledger and user registry
pub struct Ledger {
    state: RwLock<LedgerState>,
    journal: Arc<dyn Journal>,
    metrics: Arc<MetricsRegistry>,
}

impl Ledger {
    /// Open a ledger over `journal`, replaying every entry.
    ///
    /// A fresh journal is initialized with a genesis entry granting ADMIN to
    /// `admin`; opening an empty journal without an admin is an error.
    pub async fn open(
        journal: Arc<dyn Journal>,
        admin: Option<Address>,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self> {
        let started = Instant::now();
        let entries = journal.read_from(1).await?;
        let mut state = LedgerState::replay(&entries)?;

        if entries.is_empty() {
            let admin = admin.ok_or_else(|| {
                LedgerError::Configuration(
                    "journal is empty and no admin address was configured".to_string(),
                )
            })?;
            if admin.is_zero() {
                return Err(LedgerError::Configuration(
                    "admin address cannot be zero".to_string(),
                ));
            }
            let genesis = journal
                .append(NewJournalEntry::new(
                    admin,
                    Utc::now(),
                    LedgerEvent::LedgerInitialized { admin },
                ))
                .await?;
            state.apply(&genesis)?;
            info!(admin = %admin, backend = journal.backend(), "initialized new ledger journal");
        } else {
            if let Some(admin) = admin {
                if !state.has_role(Role::Admin, &admin) {
                    warn!(admin = %admin, "configured admin does not hold ADMIN in the replayed journal");
                }
            }
            info!(
                entries = entries.len(),
                head = state.last_sequence(),
                backend = journal.backend(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "replayed ledger journal"
            );
        }

        metrics
            .add_counter(metric_names::JOURNAL_REPLAYED, entries.len() as u64)
            .await;
        let ledger = Self {
            state: RwLock::new(state),
            journal,
            metrics,
        };
        ledger.refresh_gauges(&*ledger.state.read().await).await;
        Ok(ledger)
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn journal(&self) -> &Arc<dyn Journal> {
        &self.journal
    }

    /// Validate, journal and apply one write.
    ///
    /// `check` returns `None` for an accepted no-op (nothing is journaled).
    /// `output` reads the result from the state after apply.
    async fn commit<T>(
        &self,
        op: &'static str,
        caller: Address,
        check: impl FnOnce(&LedgerState, DateTime<Utc>) -> Result<Option<LedgerEvent>>,
        output: impl FnOnce(&LedgerState) -> Result<T>,
    ) -> Result<T> {
        let started = Instant::now();
        let mut state = self.state.write().await;
        let now = Utc::now();

        let event = match check(&*state, now) {
            Ok(event) => event,
            Err(e) => {
                warn!(op, caller = %caller, error = %e, "ledger write rejected");
                self.metrics.inc_counter(metric_names::WRITES_REJECTED).await;
                self.metrics
                    .inc_counter(&metric_names::rejection_counter(e.kind()))
                    .await;
                return Err(e);
            }
        };

        if let Some(event) = event {
            let appended = timed(
                &self.metrics,
                metric_names::JOURNAL_APPEND_LATENCY,
                self.journal
                    .append(NewJournalEntry::new(caller, now, event)),
            )
            .await;
            let entry = match appended {
                Ok(entry) => entry,
                Err(e) => {
                    error!(op, caller = %caller, error = %e, "journal append failed");
                    self.metrics.inc_counter(metric_names::WRITES_FAILED).await;
                    return Err(e);
                }
            };

            if let Err(e) = state.apply(&entry) {
                // The entry is durable but the projection refused it; a restart
                // replays the journal and surfaces the same error.
                error!(op, sequence = entry.sequence, error = %e, "failed to apply journaled entry");
                self.metrics.inc_counter(metric_names::WRITES_FAILED).await;
                return Err(e);
            }

            info!(
                op,
                caller = %caller,
                sequence = entry.sequence,
                event_type = entry.event.event_type(),
                "ledger write accepted"
            );
            self.metrics.inc_counter(metric_names::JOURNAL_APPENDS).await;
            self.metrics
                .inc_counter(&metric_names::event_counter(entry.event.event_type()))
                .await;
            self.refresh_gauges(&state).await;
        }

        self.metrics.inc_counter(metric_names::WRITES_ACCEPTED).await;
        self.metrics
            .observe_histogram(metric_names::WRITE_LATENCY, started.elapsed().as_secs_f64())
            .await;
        output(&*state)
    }

    async fn refresh_gauges(&self, state: &LedgerState) {
        self.metrics
            .set_gauge(metric_names::HEAD_SEQUENCE, state.last_sequence())
            .await;
        self.metrics
            .set_gauge(metric_names::TOTAL_BATCHES, state.get_total_batches())
            .await;
        self.metrics
            .set_gauge(metric_names::TOTAL_USERS, state.get_total_users())
            .await;
        self.metrics
            .set_gauge(metric_names::PAUSED, state.is_paused() as u64)
            .await;
    }

    // ----- batch writes --------------------------------------------------

    pub async fn register_batch(
        &self,
        caller: Address,
        registration: BatchRegistration,
    ) -> Result<Batch> {
        let batch_id = registration.batch_id.clone();
        self.commit(
            "register_batch",
            caller,
            |s, now| s.check_register_batch(&caller, &registration, now).map(Some),
            |s| s.get_batch(&batch_id),
        )
        .await
    }

    pub async fn update_batch_status(
        &self,
        caller: Address,
        batch_id: &BatchId,
        new_status: BatchStatus,
    ) -> Result<Batch> {
        self.commit(
            "update_batch_status",
            caller,
            |s, now| {
                s.check_update_status(&caller, batch_id, new_status, now)
                    .map(Some)
            },
            |s| s.get_batch(batch_id),
        )
        .await
    }

    pub async fn transfer_batch(
        &self,
        caller: Address,
        batch_id: &BatchId,
        request: TransferRequest,
    ) -> Result<Batch> {
        self.commit(
            "transfer_batch",
            caller,
            |s, now| s.check_transfer(&caller, batch_id, &request, now).map(Some),
            |s| s.get_batch(batch_id),
        )
        .await
    }

    pub async fn update_price(
        &self,
        caller: Address,
        batch_id: &BatchId,
        new_price: Price,
    ) -> Result<Batch> {
        self.commit(
            "update_price",
            caller,
            |s, now| {
                s.check_update_price(&caller, batch_id, new_price, now)
                    .map(Some)
            },
            |s| s.get_batch(batch_id),
        )
        .await
    }

    pub async fn mark_as_sold(
        &self,
        caller: Address,
        batch_id: &BatchId,
        buyer: Address,
        final_price: Price,
    ) -> Result<Batch> {
        self.commit(
            "mark_as_sold",
            caller,
            |s, now| {
                s.check_mark_as_sold(&caller, batch_id, buyer, final_price, now)
                    .map(Some)
            },
            |s| s.get_batch(batch_id),
        )
        .await
    }

    pub async fn add_quality_check(
        &self,
        caller: Address,
        batch_id: &BatchId,
        check: QualityCheckRequest,
    ) -> Result<QualityCheck> {
        self.commit(
            "add_quality_check",
            caller,
            |s, _| s.check_add_quality_check(&caller, batch_id, &check).map(Some),
            |s| {
                s.get_quality_checks(batch_id)?
                    .pop()
                    .ok_or_else(|| LedgerError::Internal("quality check not recorded".into()))
            },
        )
        .await
    }

    // ----- access writes -------------------------------------------------

    /// Granting a role the account already holds records nothing
    pub async fn grant_role(&self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.commit(
            "grant_role",
            caller,
            |s, _| s.check_grant_role(&caller, role, &account),
            |_| Ok(()),
        )
        .await
    }

    /// Revoking a role the account does not hold records nothing
    pub async fn revoke_role(&self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.commit(
            "revoke_role",
            caller,
            |s, _| s.check_revoke_role(&caller, role, &account),
            |_| Ok(()),
        )
        .await
    }

    pub async fn pause(&self, caller: Address) -> Result<()> {
        self.commit(
            "pause",
            caller,
            |s, _| s.check_pause(&caller).map(Some),
            |_| Ok(()),
        )
        .await
    }

    pub async fn unpause(&self, caller: Address) -> Result<()> {
        self.commit(
            "unpause",
            caller,
            |s, _| s.check_unpause(&caller).map(Some),
            |_| Ok(()),
        )
        .await
    }

    // ----- registry writes -----------------------------------------------

    pub async fn register_user(
        &self,
        caller: Address,
        registration: UserRegistration,
    ) -> Result<UserProfile> {
        self.commit(
            "register_user",
            caller,
            |s, _| s.check_register_user(&caller, &registration).map(Some),
            |s| s.get_user(&caller),
        )
        .await
    }

    pub async fn update_user_profile(
        &self,
        caller: Address,
        update: ProfileUpdate,
    ) -> Result<UserProfile> {
        self.commit(
            "update_user_profile",
            caller,
            |s, _| s.check_update_profile(&caller, &update).map(Some),
            |s| s.get_user(&caller),
        )
        .await
    }

    pub async fn update_user_role(
        &self,
        caller: Address,
        account: Address,
        new_role: RoleId,
    ) -> Result<UserProfile> {
        self.commit(
            "update_user_role",
            caller,
            |s, _| {
                s.check_update_user_role(&caller, &account, &new_role)
                    .map(Some)
            },
            |s| s.get_user(&account),
        )
        .await
    }

    pub async fn deactivate_user(&self, caller: Address, account: Address) -> Result<UserProfile> {
        self.commit(
            "deactivate_user",
            caller,
            |s, _| s.check_set_user_active(&caller, &account, false).map(Some),
            |s| s.get_user(&account),
        )
        .await
    }

    pub async fn reactivate_user(&self, caller: Address, account: Address) -> Result<UserProfile> {
        self.commit(
            "reactivate_user",
            caller,
            |s, _| s.check_set_user_active(&caller, &account, true).map(Some),
            |s| s.get_user(&account),
        )
        .await
    }

    // ----- reads ---------------------------------------------------------

    pub async fn get_batch(&self, batch_id: &BatchId) -> Result<Batch> {
        self.state.read().await.get_batch(batch_id)
    }

    pub async fn batch_exists(&self, batch_id: &BatchId) -> bool {
        self.state.read().await.batch_exists(batch_id)
    }

    pub async fn get_transfer_history(&self, batch_id: &BatchId) -> Result<Vec<TransferRecord>> {
        self.state.read().await.get_transfer_history(batch_id)
    }

    pub async fn get_quality_checks(&self, batch_id: &BatchId) -> Result<Vec<QualityCheck>> {
        self.state.read().await.get_quality_checks(batch_id)
    }

    pub async fn get_batch_history(&self, batch_id: &BatchId) -> Result<Vec<JournalEntry>> {
        self.state.read().await.get_batch_history(batch_id)
    }

    pub async fn get_user_batches(&self, account: &Address) -> Vec<BatchId> {
        self.state.read().await.get_user_batches(account)
    }

    pub async fn get_total_batches(&self) -> u64 {
        self.state.read().await.get_total_batches()
    }

    pub async fn get_all_batch_ids(&self) -> Vec<BatchId> {
        self.state.read().await.get_all_batch_ids()
    }

    pub async fn has_role(&self, role: Role, account: &Address) -> bool {
        self.state.read().await.has_role(role, account)
    }

    pub async fn roles_of(&self, account: &Address) -> Vec<Role> {
        self.state.read().await.roles_of(account)
    }

    /// Members of every role, in role order
    pub async fn role_members(&self) -> Vec<RoleMembers> {
        self.state.read().await.role_members()
    }

    pub async fn is_paused(&self) -> bool {
        self.state.read().await.is_paused()
    }

    pub async fn get_user(&self, account: &Address) -> Result<UserProfile> {
        self.state.read().await.get_user(account)
    }

    pub async fn get_users_by_role(&self, role: Role) -> Vec<UserProfile> {
        self.state.read().await.get_users_by_role(role)
    }

    pub async fn get_all_users(&self) -> Vec<Address> {
        self.state.read().await.get_all_users()
    }

    pub async fn get_total_users(&self) -> u64 {
        self.state.read().await.get_total_users()
    }

    pub async fn is_active_user(&self, account: &Address) -> bool {
        self.state.read().await.is_active_user(account)
    }

    pub async fn summary(&self) -> LedgerSummary {
        self.state.read().await.summary()
    }

    /// Clone of the full projection
    pub async fn snapshot(&self) -> LedgerState {
        self.state.read().await.clone()
    }
}
