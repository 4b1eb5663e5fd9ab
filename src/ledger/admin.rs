//! Role administration and the pause switch

use super::LedgerState;
use crate::domain::{Address, LedgerEvent, Role};
use crate::infra::{LedgerError, Result};

impl LedgerState {
    /// `None` when the account already holds the role
    pub(crate) fn check_grant_role(
        &self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> Result<Option<LedgerEvent>> {
        self.require_role(caller, Role::Admin)?;
        if account.is_zero() {
            return Err(LedgerError::invalid_input("cannot grant a role to zero address"));
        }
        if self.access.has_role(role, account) {
            return Ok(None);
        }
        Ok(Some(LedgerEvent::RoleGranted {
            role,
            account: *account,
        }))
    }

    /// `None` when the account does not hold the role
    pub(crate) fn check_revoke_role(
        &self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> Result<Option<LedgerEvent>> {
        self.require_role(caller, Role::Admin)?;
        if !self.access.has_role(role, account) {
            return Ok(None);
        }
        Ok(Some(LedgerEvent::RoleRevoked {
            role,
            account: *account,
        }))
    }

    pub(crate) fn check_pause(&self, caller: &Address) -> Result<LedgerEvent> {
        self.require_role(caller, Role::Admin)?;
        if self.paused {
            return Err(LedgerError::invalid_transition("ledger is already paused"));
        }
        Ok(LedgerEvent::Paused)
    }

    pub(crate) fn check_unpause(&self, caller: &Address) -> Result<LedgerEvent> {
        self.require_role(caller, Role::Admin)?;
        if !self.paused {
            return Err(LedgerError::invalid_transition("ledger is not paused"));
        }
        Ok(LedgerEvent::Unpaused)
    }
}
