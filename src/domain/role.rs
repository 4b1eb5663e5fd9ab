//! Participant roles
//!
//! Role constants are shared between the batch ledger and the user registry.
//! Each role maps to a [`RoleId`] derived from its constant name, so the two
//! sides agree on identifiers without a lookup table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::RoleId;

/// Recognized participant roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Farmer,
    Distributor,
    Retailer,
    Consumer,
    Regulator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Farmer,
        Role::Distributor,
        Role::Retailer,
        Role::Consumer,
        Role::Regulator,
        Role::Admin,
    ];

    /// Constant name the role id is derived from
    pub fn constant_name(&self) -> &'static str {
        match self {
            Role::Farmer => "FARMER_ROLE",
            Role::Distributor => "DISTRIBUTOR_ROLE",
            Role::Retailer => "RETAILER_ROLE",
            Role::Consumer => "CONSUMER_ROLE",
            Role::Regulator => "REGULATOR_ROLE",
            Role::Admin => "ADMIN_ROLE",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "FARMER",
            Role::Distributor => "DISTRIBUTOR",
            Role::Retailer => "RETAILER",
            Role::Consumer => "CONSUMER",
            Role::Regulator => "REGULATOR",
            Role::Admin => "ADMIN",
        }
    }

    pub fn id(&self) -> RoleId {
        RoleId::from_name(self.constant_name())
    }

    /// Resolve a role id back to a recognized role.
    ///
    /// Returns `None` for any id that is not one of the six role constants.
    pub fn from_id(id: &RoleId) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.id() == *id)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Accepts a role name (`farmer`, `FARMER`, `FARMER_ROLE`) or a hex role id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with("0x") {
            let id: RoleId = trimmed.parse().map_err(|e| format!("{e}"))?;
            return Role::from_id(&id).ok_or_else(|| format!("unrecognized role id: {trimmed}"));
        }

        let upper = trimmed.to_ascii_uppercase();
        let name = upper.strip_suffix("_ROLE").unwrap_or(&upper);
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == name)
            .ok_or_else(|| format!("unrecognized role: {trimmed}"))
    }
}
