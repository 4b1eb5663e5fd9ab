//! In-memory projection of the journal
//!
//! `LedgerState` is only ever mutated by [`LedgerState::apply`]. Validation
//! lives in the `batches` and `users` modules and borrows the state
//! immutably, so a rejected operation can never leave a partial change.

use std::collections::HashMap;

use crate::access::{AccessControl, RoleMembers};
use crate::domain::{
    Address, Batch, BatchId, JournalEntry, LedgerEvent, QualityCheck, Role, TransferRecord,
    UserProfile,
};
use crate::infra::{LedgerError, Result};

/// A batch together with its append-only histories
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BatchRecord {
    pub batch: Batch,
    pub transfers: Vec<TransferRecord>,
    pub quality_checks: Vec<QualityCheck>,
    /// Journal entries that touched this batch
    pub history: Vec<JournalEntry>,
}

/// Aggregate counts exposed by status endpoints and the admin CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LedgerSummary {
    pub head_sequence: u64,
    pub paused: bool,
    pub total_batches: u64,
    pub total_users: u64,
    pub active_users: u64,
    pub total_transfers: u64,
    pub total_quality_checks: u64,
}

/// Full ledger state rebuilt from the journal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub(crate) access: AccessControl,
    pub(crate) paused: bool,
    pub(crate) batches: HashMap<BatchId, BatchRecord>,
    pub(crate) batch_order: Vec<BatchId>,
    /// Batches each address registered or received, first-touch order
    pub(crate) account_batches: HashMap<Address, Vec<BatchId>>,
    pub(crate) users: HashMap<Address, UserProfile>,
    pub(crate) user_order: Vec<Address>,
    pub(crate) last_sequence: u64,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from journal entries in sequence order
    pub fn replay<'a>(entries: impl IntoIterator<Item = &'a JournalEntry>) -> Result<Self> {
        let mut state = Self::new();
        for entry in entries {
            state.apply(entry)?;
        }
        Ok(state)
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Fold one accepted journal entry into the state.
    ///
    /// Entries must arrive in gap-free sequence order and carry an intact
    /// payload hash. An event that does not fit the current state means the
    /// journal was written by something other than this ledger.
    pub fn apply(&mut self, entry: &JournalEntry) -> Result<()> {
        let sequence = entry.sequence;
        let corrupted = |reason: String| LedgerError::JournalCorrupted { sequence, reason };

        if sequence != self.last_sequence + 1 {
            return Err(corrupted(format!(
                "expected sequence {}",
                self.last_sequence + 1
            )));
        }
        if !entry.verify_payload_hash() {
            return Err(corrupted("payload hash mismatch".to_string()));
        }

        let at = entry.recorded_at;
        match &entry.event {
            LedgerEvent::LedgerInitialized { admin } => {
                if sequence != 1 {
                    return Err(corrupted("ledger initialized twice".to_string()));
                }
                self.access.grant(Role::Admin, *admin);
            }
            LedgerEvent::RoleGranted { role, account } => {
                self.access.grant(*role, *account);
            }
            LedgerEvent::RoleRevoked { role, account } => {
                self.access.revoke(*role, account);
            }
            LedgerEvent::Paused => self.paused = true,
            LedgerEvent::Unpaused => self.paused = false,

            LedgerEvent::BatchRegistered { registration } => {
                if self.batches.contains_key(&registration.batch_id) {
                    return Err(corrupted(format!(
                        "batch {} registered twice",
                        registration.batch_id
                    )));
                }
                let batch = Batch::from_registration(registration, entry.actor, at);
                self.batch_order.push(batch.batch_id.clone());
                self.track_account_batch(entry.actor, &batch.batch_id);
                self.batches.insert(
                    batch.batch_id.clone(),
                    BatchRecord {
                        batch,
                        transfers: Vec::new(),
                        quality_checks: Vec::new(),
                        history: Vec::new(),
                    },
                );
            }
            LedgerEvent::BatchStatusUpdated { batch_id, to, .. } => {
                let record = self.record_mut(batch_id).ok_or_else(|| {
                    corrupted(format!("status update for unknown batch {batch_id}"))
                })?;
                record.batch.status = *to;
                record.batch.updated_at = at;
            }
            LedgerEvent::BatchTransferred {
                batch_id,
                from,
                to,
                price,
                location,
                notes,
            } => {
                let record = self.record_mut(batch_id).ok_or_else(|| {
                    corrupted(format!("transfer of unknown batch {batch_id}"))
                })?;
                record.batch.current_owner = *to;
                record.batch.current_price = *price;
                record.batch.updated_at = at;
                record.transfers.push(TransferRecord {
                    from: *from,
                    to: *to,
                    price: *price,
                    location: location.clone(),
                    notes: notes.clone(),
                    timestamp: at,
                });
                self.track_account_batch(*to, batch_id);
            }
            LedgerEvent::PriceUpdated {
                batch_id,
                new_price,
                ..
            } => {
                let record = self.record_mut(batch_id).ok_or_else(|| {
                    corrupted(format!("price update for unknown batch {batch_id}"))
                })?;
                record.batch.current_price = *new_price;
                record.batch.updated_at = at;
            }
            LedgerEvent::BatchSold {
                batch_id,
                seller,
                buyer,
                final_price,
            } => {
                let record = self
                    .record_mut(batch_id)
                    .ok_or_else(|| corrupted(format!("sale of unknown batch {batch_id}")))?;
                record.batch.status = crate::domain::BatchStatus::Sold;
                record.batch.current_owner = *buyer;
                record.batch.current_price = *final_price;
                record.batch.updated_at = at;
                record.transfers.push(TransferRecord {
                    from: *seller,
                    to: *buyer,
                    price: *final_price,
                    location: String::new(),
                    notes: "sold".to_string(),
                    timestamp: at,
                });
                self.track_account_batch(*buyer, batch_id);
            }
            LedgerEvent::QualityCheckAdded {
                batch_id,
                score,
                passed,
                notes,
                report_hash,
            } => {
                let record = self.record_mut(batch_id).ok_or_else(|| {
                    corrupted(format!("quality check for unknown batch {batch_id}"))
                })?;
                record.quality_checks.push(QualityCheck {
                    inspector: entry.actor,
                    score: *score,
                    passed: *passed,
                    notes: notes.clone(),
                    report_hash: report_hash.clone(),
                    timestamp: at,
                });
                record.batch.updated_at = at;
            }

            LedgerEvent::UserRegistered { registration } => {
                let role = Role::from_id(&registration.role)
                    .ok_or_else(|| corrupted(format!("unrecognized role {}", registration.role)))?;
                if self.users.contains_key(&entry.actor) {
                    return Err(corrupted(format!("user {} registered twice", entry.actor)));
                }
                self.user_order.push(entry.actor);
                self.users.insert(
                    entry.actor,
                    UserProfile {
                        address: entry.actor,
                        name: registration.name.clone(),
                        email: registration.email.clone(),
                        phone: registration.phone.clone(),
                        physical_address: registration.physical_address.clone(),
                        role,
                        profile_hash: registration.profile_hash.clone(),
                        is_active: true,
                        registered_at: at,
                        updated_at: at,
                    },
                );
            }
            LedgerEvent::UserProfileUpdated { update } => {
                let user = self
                    .users
                    .get_mut(&entry.actor)
                    .ok_or_else(|| corrupted(format!("update of unknown user {}", entry.actor)))?;
                user.name = update.name.clone();
                user.email = update.email.clone();
                user.phone = update.phone.clone();
                user.physical_address = update.physical_address.clone();
                user.profile_hash = update.profile_hash.clone();
                user.updated_at = at;
            }
            LedgerEvent::UserRoleUpdated {
                account, new_role, ..
            } => {
                let user = self.user_mut(account, sequence)?;
                user.role = *new_role;
                user.updated_at = at;
            }
            LedgerEvent::UserDeactivated { account } => {
                let user = self.user_mut(account, sequence)?;
                user.is_active = false;
                user.updated_at = at;
            }
            LedgerEvent::UserReactivated { account } => {
                let user = self.user_mut(account, sequence)?;
                user.is_active = true;
                user.updated_at = at;
            }
        }

        if let Some(batch_id) = entry.event.batch_id() {
            if let Some(record) = self.batches.get_mut(batch_id) {
                record.history.push(entry.clone());
            }
        }
        self.last_sequence = sequence;
        Ok(())
    }

    fn record_mut(&mut self, batch_id: &BatchId) -> Option<&mut BatchRecord> {
        self.batches.get_mut(batch_id)
    }

    fn user_mut(&mut self, account: &Address, sequence: u64) -> Result<&mut UserProfile> {
        self.users
            .get_mut(account)
            .ok_or_else(|| LedgerError::JournalCorrupted {
                sequence,
                reason: format!("unknown user {account}"),
            })
    }

    fn track_account_batch(&mut self, account: Address, batch_id: &BatchId) {
        let ids = self.account_batches.entry(account).or_default();
        if !ids.contains(batch_id) {
            ids.push(batch_id.clone());
        }
    }

    // ----- shared checks -------------------------------------------------

    pub(crate) fn require_role(&self, caller: &Address, role: Role) -> Result<()> {
        if self.access.holds(caller, role) {
            Ok(())
        } else {
            Err(LedgerError::unauthorized(format!(
                "{caller} does not hold {role}"
            )))
        }
    }

    pub(crate) fn require_not_paused(&self) -> Result<()> {
        if self.paused {
            Err(LedgerError::Paused)
        } else {
            Ok(())
        }
    }

    pub(crate) fn record(&self, batch_id: &BatchId) -> Result<&BatchRecord> {
        self.batches
            .get(batch_id)
            .ok_or_else(|| LedgerError::not_found(format!("batch {batch_id} does not exist")))
    }

    pub(crate) fn user(&self, account: &Address) -> Result<&UserProfile> {
        self.users
            .get(account)
            .ok_or_else(|| LedgerError::not_found(format!("user {account} is not registered")))
    }

    // ----- access reads --------------------------------------------------

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.access.has_role(role, account)
    }

    pub fn roles_of(&self, account: &Address) -> Vec<Role> {
        self.access.roles_of(account)
    }

    pub fn role_members(&self) -> Vec<RoleMembers> {
        self.access.members()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn summary(&self) -> LedgerSummary {
        let records = self.batches.values();
        let (transfers, checks) = records.fold((0u64, 0u64), |(t, c), r| {
            (t + r.transfers.len() as u64, c + r.quality_checks.len() as u64)
        });
        LedgerSummary {
            head_sequence: self.last_sequence,
            paused: self.paused,
            total_batches: self.batch_order.len() as u64,
            total_users: self.user_order.len() as u64,
            active_users: self.users.values().filter(|u| u.is_active).count() as u64,
            total_transfers: transfers,
            total_quality_checks: checks,
        }
    }
}
