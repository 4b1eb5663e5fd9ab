//! Shared request and response types for REST API handlers.

use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::utils::parse_role_id;
use crate::domain::{Address, BatchId, BatchStatus, Price, UserRegistration};

// ============================================================================
// Batch types
// ============================================================================

/// Request body for `POST /batches/:batch_id/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    /// Numeric status, 0 (registered) through 6 (expired)
    pub status: BatchStatus,
}

/// Request body for `POST /batches/:batch_id/price`.
#[derive(Debug, Deserialize)]
pub struct PriceUpdateRequest {
    pub new_price: Price,
}

/// Request body for `POST /batches/:batch_id/sell`.
#[derive(Debug, Deserialize)]
pub struct SellRequest {
    pub buyer: Address,
    pub final_price: Price,
}

#[derive(Debug, Serialize)]
pub struct BatchListResponse {
    pub batch_ids: Vec<BatchId>,
    pub total: u64,
}

// ============================================================================
// Access types
// ============================================================================

/// Request body for `POST /roles/grant` and `POST /roles/revoke`.
#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    /// Role name or hex role id
    pub role: String,
    pub account: Address,
}

// ============================================================================
// Registry types
// ============================================================================

/// Request body for `POST /users`; the caller registers themselves.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub physical_address: String,
    /// Role name or hex role id
    pub role: String,
    #[serde(default)]
    pub profile_hash: String,
}

impl RegisterUserRequest {
    pub fn into_registration(self) -> Result<UserRegistration, ApiError> {
        Ok(UserRegistration {
            role: parse_role_id(&self.role)?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            physical_address: self.physical_address,
            profile_hash: self.profile_hash,
        })
    }
}

/// Request body for `PUT /users/:address/role`.
#[derive(Debug, Deserialize)]
pub struct UserRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<Address>,
    pub total: u64,
}
