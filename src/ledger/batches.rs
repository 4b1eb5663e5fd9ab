//! Batch lifecycle rules
//!
//! Each `check_*` method validates one write against the current state and
//! returns the single event it would produce. Nothing here mutates state.

use chrono::{DateTime, Utc};

use super::LedgerState;
use crate::domain::{
    Address, Batch, BatchId, BatchRegistration, BatchStatus, JournalEntry, LedgerEvent, Price,
    QualityCheck, QualityCheckRequest, Role, TransferRecord, TransferRequest, QUALITY_MAX_SCORE,
};
use crate::infra::{LedgerError, Result};

fn require_non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(LedgerError::invalid_input(format!("{field} cannot be empty")))
    } else {
        Ok(())
    }
}

fn require_positive_price(price: Price) -> Result<()> {
    if price == 0 {
        Err(LedgerError::invalid_input("price must be greater than zero"))
    } else {
        Ok(())
    }
}

fn require_owner(batch: &Batch, caller: &Address) -> Result<()> {
    if batch.current_owner == *caller {
        Ok(())
    } else {
        Err(LedgerError::unauthorized(format!(
            "{caller} is not the owner of batch {}",
            batch.batch_id
        )))
    }
}

/// Sold/Expired batches and batches past their expiry date cannot move
fn require_tradable(batch: &Batch, now: DateTime<Utc>) -> Result<()> {
    match batch.status {
        BatchStatus::Sold => Err(LedgerError::invalid_transition("batch already sold")),
        BatchStatus::Expired => Err(LedgerError::invalid_transition("batch has expired")),
        _ if batch.is_expired_at(now) => Err(LedgerError::invalid_transition(format!(
            "batch {} passed its expiry date",
            batch.batch_id
        ))),
        _ => Ok(()),
    }
}

impl LedgerState {
    pub(crate) fn check_register_batch(
        &self,
        caller: &Address,
        registration: &BatchRegistration,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        self.require_not_paused()?;
        self.require_role(caller, Role::Farmer)?;

        if registration.batch_id.is_empty() {
            return Err(LedgerError::invalid_input("batch id cannot be empty"));
        }
        require_non_empty(&registration.produce_type, "produce type")?;
        require_non_empty(&registration.origin_farm, "origin farm")?;
        if registration.quantity == 0 {
            return Err(LedgerError::invalid_input(
                "quantity must be greater than zero",
            ));
        }
        require_positive_price(registration.price_per_unit)?;
        if registration.expiry_date <= now {
            return Err(LedgerError::invalid_input(
                "expiry date must be in the future",
            ));
        }
        if self.batches.contains_key(&registration.batch_id) {
            return Err(LedgerError::AlreadyExists(format!(
                "batch {} already exists",
                registration.batch_id
            )));
        }

        Ok(LedgerEvent::BatchRegistered {
            registration: registration.clone(),
        })
    }

    pub(crate) fn check_update_status(
        &self,
        caller: &Address,
        batch_id: &BatchId,
        new_status: BatchStatus,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        self.require_not_paused()?;
        let batch = &self.record(batch_id)?.batch;
        let current = batch.status;

        if !current.can_transition_to(new_status) {
            return Err(LedgerError::invalid_transition(format!(
                "cannot move batch {batch_id} from {current} to {new_status}"
            )));
        }
        if new_status != BatchStatus::Expired && batch.is_expired_at(now) {
            return Err(LedgerError::invalid_transition(format!(
                "batch {batch_id} passed its expiry date; only expired is allowed"
            )));
        }

        let regulator_expiry =
            new_status == BatchStatus::Expired && self.access.holds(caller, Role::Regulator);
        if !regulator_expiry {
            require_owner(batch, caller)?;
            if !self.access.holds_any(caller, new_status.permitted_roles()) {
                return Err(LedgerError::unauthorized(format!(
                    "{caller} lacks a role permitted to set status {new_status}"
                )));
            }
        }

        Ok(LedgerEvent::BatchStatusUpdated {
            batch_id: batch_id.clone(),
            from: current,
            to: new_status,
        })
    }

    pub(crate) fn check_transfer(
        &self,
        caller: &Address,
        batch_id: &BatchId,
        request: &TransferRequest,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        self.require_not_paused()?;
        let batch = &self.record(batch_id)?.batch;
        require_owner(batch, caller)?;

        if request.to.is_zero() {
            return Err(LedgerError::invalid_input("cannot transfer to zero address"));
        }
        if request.to == *caller {
            return Err(LedgerError::invalid_input("cannot transfer to yourself"));
        }
        require_positive_price(request.new_price)?;
        require_tradable(batch, now)?;

        Ok(LedgerEvent::BatchTransferred {
            batch_id: batch_id.clone(),
            from: *caller,
            to: request.to,
            price: request.new_price,
            location: request.location.clone(),
            notes: request.notes.clone(),
        })
    }

    pub(crate) fn check_update_price(
        &self,
        caller: &Address,
        batch_id: &BatchId,
        new_price: Price,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        self.require_not_paused()?;
        let batch = &self.record(batch_id)?.batch;
        require_owner(batch, caller)?;
        require_positive_price(new_price)?;
        require_tradable(batch, now)?;

        Ok(LedgerEvent::PriceUpdated {
            batch_id: batch_id.clone(),
            old_price: batch.current_price,
            new_price,
        })
    }

    pub(crate) fn check_mark_as_sold(
        &self,
        caller: &Address,
        batch_id: &BatchId,
        buyer: Address,
        final_price: Price,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        self.require_not_paused()?;
        let batch = &self.record(batch_id)?.batch;
        // A second sale is a lifecycle error even though ownership has moved
        require_tradable(batch, now)?;
        require_owner(batch, caller)?;

        if buyer.is_zero() {
            return Err(LedgerError::invalid_input("buyer cannot be zero address"));
        }
        require_positive_price(final_price)?;

        Ok(LedgerEvent::BatchSold {
            batch_id: batch_id.clone(),
            seller: *caller,
            buyer,
            final_price,
        })
    }

    pub(crate) fn check_add_quality_check(
        &self,
        caller: &Address,
        batch_id: &BatchId,
        check: &QualityCheckRequest,
    ) -> Result<LedgerEvent> {
        self.require_not_paused()?;
        self.require_role(caller, Role::Regulator)?;
        self.record(batch_id)?;

        if check.score > QUALITY_MAX_SCORE {
            return Err(LedgerError::invalid_input(format!(
                "score must be between 0 and {QUALITY_MAX_SCORE}"
            )));
        }

        Ok(LedgerEvent::QualityCheckAdded {
            batch_id: batch_id.clone(),
            score: check.score,
            passed: QualityCheck::passes(check.score),
            notes: check.notes.clone(),
            report_hash: check.report_hash.clone(),
        })
    }

    // ----- reads ---------------------------------------------------------

    pub fn get_batch(&self, batch_id: &BatchId) -> Result<Batch> {
        Ok(self.record(batch_id)?.batch.clone())
    }

    pub fn batch_exists(&self, batch_id: &BatchId) -> bool {
        self.batches.contains_key(batch_id)
    }

    pub fn get_transfer_history(&self, batch_id: &BatchId) -> Result<Vec<TransferRecord>> {
        Ok(self.record(batch_id)?.transfers.clone())
    }

    pub fn get_quality_checks(&self, batch_id: &BatchId) -> Result<Vec<QualityCheck>> {
        Ok(self.record(batch_id)?.quality_checks.clone())
    }

    /// Journal entries that touched the batch, oldest first
    pub fn get_batch_history(&self, batch_id: &BatchId) -> Result<Vec<JournalEntry>> {
        Ok(self.record(batch_id)?.history.clone())
    }

    /// Ids of batches the account registered or received, first-touch order
    pub fn get_user_batches(&self, account: &Address) -> Vec<BatchId> {
        self.account_batches
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_total_batches(&self) -> u64 {
        self.batch_order.len() as u64
    }

    /// All batch ids in registration order
    pub fn get_all_batch_ids(&self) -> Vec<BatchId> {
        self.batch_order.clone()
    }
}
