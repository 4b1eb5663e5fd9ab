//! User registry rules

use super::LedgerState;
use crate::domain::{
    Address, LedgerEvent, ProfileUpdate, Role, RoleId, UserProfile, UserRegistration,
};
use crate::infra::{LedgerError, Result};

fn require_contact_fields(name: &str, email: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::invalid_input("name cannot be empty"));
    }
    if email.trim().is_empty() {
        return Err(LedgerError::invalid_input("email cannot be empty"));
    }
    Ok(())
}

fn recognized_role(role_id: &RoleId) -> Result<Role> {
    Role::from_id(role_id).ok_or_else(|| LedgerError::invalid_input(format!("invalid role {role_id}")))
}

impl LedgerState {
    pub(crate) fn check_register_user(
        &self,
        caller: &Address,
        registration: &UserRegistration,
    ) -> Result<LedgerEvent> {
        require_contact_fields(&registration.name, &registration.email)?;
        recognized_role(&registration.role)?;
        if self.users.contains_key(caller) {
            return Err(LedgerError::AlreadyExists(format!(
                "user {caller} already registered"
            )));
        }

        Ok(LedgerEvent::UserRegistered {
            registration: registration.clone(),
        })
    }

    pub(crate) fn check_update_profile(
        &self,
        caller: &Address,
        update: &ProfileUpdate,
    ) -> Result<LedgerEvent> {
        let user = self.user(caller)?;
        if !user.is_active {
            return Err(LedgerError::unauthorized(format!(
                "user {caller} is deactivated"
            )));
        }
        require_contact_fields(&update.name, &update.email)?;

        Ok(LedgerEvent::UserProfileUpdated {
            update: update.clone(),
        })
    }

    pub(crate) fn check_update_user_role(
        &self,
        caller: &Address,
        account: &Address,
        new_role: &RoleId,
    ) -> Result<LedgerEvent> {
        self.require_role(caller, Role::Admin)?;
        let user = self.user(account)?;
        let new_role = recognized_role(new_role)?;

        Ok(LedgerEvent::UserRoleUpdated {
            account: *account,
            old_role: user.role,
            new_role,
        })
    }

    pub(crate) fn check_set_user_active(
        &self,
        caller: &Address,
        account: &Address,
        active: bool,
    ) -> Result<LedgerEvent> {
        self.require_role(caller, Role::Admin)?;
        let user = self.user(account)?;

        match (user.is_active, active) {
            (false, false) => Err(LedgerError::invalid_transition(format!(
                "user {account} is already deactivated"
            ))),
            (true, true) => Err(LedgerError::invalid_transition(format!(
                "user {account} is already active"
            ))),
            (true, false) => Ok(LedgerEvent::UserDeactivated { account: *account }),
            (false, true) => Ok(LedgerEvent::UserReactivated { account: *account }),
        }
    }

    // ----- reads ---------------------------------------------------------

    pub fn get_user(&self, account: &Address) -> Result<UserProfile> {
        self.user(account).cloned()
    }

    /// Active users holding `role`, registration order
    pub fn get_users_by_role(&self, role: Role) -> Vec<UserProfile> {
        self.user_order
            .iter()
            .filter_map(|address| self.users.get(address))
            .filter(|user| user.is_active && user.role == role)
            .cloned()
            .collect()
    }

    /// Every registered address, including deactivated users
    pub fn get_all_users(&self) -> Vec<Address> {
        self.user_order.clone()
    }

    pub fn get_total_users(&self) -> u64 {
        self.user_order.len() as u64
    }

    pub fn is_active_user(&self, account: &Address) -> bool {
        self.users
            .get(account)
            .map(|user| user.is_active)
            .unwrap_or(false)
    }
}
