//! Role membership table

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::permits;
use crate::domain::{Address, Role};

/// Which accounts hold which roles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControl {
    members: HashMap<Role, BTreeSet<Address>>,
}

/// Snapshot of one role's members
#[derive(Debug, Clone, Serialize)]
pub struct RoleMembers {
    pub role: Role,
    pub accounts: Vec<Address>,
}

impl AccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact membership; ADMIN does not imply other roles here
    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.members
            .get(&role)
            .map(|set| set.contains(account))
            .unwrap_or(false)
    }

    /// Whether `account` passes a check for `required`
    pub fn holds(&self, account: &Address, required: Role) -> bool {
        self.roles_of(account)
            .into_iter()
            .any(|held| permits(held, required))
    }

    /// Whether `account` passes a check for any of `required`
    pub fn holds_any(&self, account: &Address, required: &[Role]) -> bool {
        required.iter().any(|role| self.holds(account, *role))
    }

    pub fn roles_of(&self, account: &Address) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| self.has_role(*role, account))
            .collect()
    }

    /// Returns false if the account already held the role
    pub fn grant(&mut self, role: Role, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    /// Returns false if the account did not hold the role
    pub fn revoke(&mut self, role: Role, account: &Address) -> bool {
        self.members
            .get_mut(&role)
            .map(|set| set.remove(account))
            .unwrap_or(false)
    }

    pub fn members(&self) -> Vec<RoleMembers> {
        Role::ALL
            .into_iter()
            .map(|role| RoleMembers {
                role,
                accounts: self
                    .members
                    .get(&role)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default(),
            })
            .collect()
    }
}
