//! Registered participant profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Address, Role, RoleId};

/// Registration request for the user registry.
///
/// The role is supplied as a raw [`RoleId`] and validated on registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistration {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub physical_address: String,
    pub role: RoleId,
    #[serde(default)]
    pub profile_hash: String,
}

/// Contact fields a user may change on their own profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub physical_address: String,
    #[serde(default)]
    pub profile_hash: String,
}

/// Stored user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub address: Address,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub physical_address: String,
    pub role: Role,
    pub profile_hash: String,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
