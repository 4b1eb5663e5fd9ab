//! Produce batch model and lifecycle rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Address, BatchId, Price, Role};

/// Minimum quality score for a check to count as passed
pub const QUALITY_PASS_THRESHOLD: u8 = 70;

/// Maximum quality score
pub const QUALITY_MAX_SCORE: u8 = 100;

/// Batch lifecycle status.
///
/// The numeric values are part of the external contract and must not change.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde_repr::Serialize_repr,
    serde_repr::Deserialize_repr,
)]
#[repr(u8)]
pub enum BatchStatus {
    Registered = 0,
    Harvested = 1,
    Processing = 2,
    InTransit = 3,
    Delivered = 4,
    Sold = 5,
    Expired = 6,
}

impl BatchStatus {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(BatchStatus::Registered),
            1 => Some(BatchStatus::Harvested),
            2 => Some(BatchStatus::Processing),
            3 => Some(BatchStatus::InTransit),
            4 => Some(BatchStatus::Delivered),
            5 => Some(BatchStatus::Sold),
            6 => Some(BatchStatus::Expired),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Registered => "registered",
            BatchStatus::Harvested => "harvested",
            BatchStatus::Processing => "processing",
            BatchStatus::InTransit => "in_transit",
            BatchStatus::Delivered => "delivered",
            BatchStatus::Sold => "sold",
            BatchStatus::Expired => "expired",
        }
    }

    /// Sold and Expired end the lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Sold | BatchStatus::Expired)
    }

    /// Whether the transition graph has an edge `self -> target`.
    ///
    /// Logistics statuses only move forward. Sold and Expired are reachable
    /// from any non-terminal status. Nothing leaves a terminal status and
    /// Registered is never a target.
    pub fn can_transition_to(&self, target: BatchStatus) -> bool {
        if self.is_terminal() || target == BatchStatus::Registered {
            return false;
        }
        match target {
            BatchStatus::Sold | BatchStatus::Expired => true,
            _ => target.as_u8() > self.as_u8(),
        }
    }

    /// Roles an owner must hold (one of) to move a batch into this status.
    pub fn permitted_roles(&self) -> &'static [Role] {
        match self {
            BatchStatus::Registered => &[],
            BatchStatus::Harvested => &[Role::Farmer],
            BatchStatus::Processing => &[Role::Farmer, Role::Distributor],
            BatchStatus::InTransit => &[Role::Distributor],
            BatchStatus::Delivered => &[Role::Distributor, Role::Retailer],
            BatchStatus::Sold => &[Role::Farmer, Role::Distributor, Role::Retailer],
            BatchStatus::Expired => &[
                Role::Farmer,
                Role::Distributor,
                Role::Retailer,
                Role::Regulator,
            ],
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters supplied by a farmer when registering a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRegistration {
    pub batch_id: BatchId,
    pub produce_type: String,
    #[serde(default)]
    pub variety: String,
    /// Quantity in kilograms
    pub quantity: u64,
    pub origin_farm: String,
    pub price_per_unit: Price,
    pub expiry_date: DateTime<Utc>,
    #[serde(default)]
    pub certification_hash: String,
    #[serde(default)]
    pub image_hash: String,
    #[serde(default)]
    pub is_organic: bool,
}

/// A tracked produce batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: BatchId,
    pub produce_type: String,
    pub variety: String,
    pub quantity: u64,
    pub origin_farm: String,
    /// Address that registered the batch
    pub farmer: Address,
    pub base_price: Price,
    pub current_price: Price,
    pub expiry_date: DateTime<Utc>,
    pub certification_hash: String,
    pub image_hash: String,
    pub is_organic: bool,
    pub current_owner: Address,
    pub status: BatchStatus,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Build the initial record for a freshly registered batch
    pub fn from_registration(
        registration: &BatchRegistration,
        farmer: Address,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            batch_id: registration.batch_id.clone(),
            produce_type: registration.produce_type.clone(),
            variety: registration.variety.clone(),
            quantity: registration.quantity,
            origin_farm: registration.origin_farm.clone(),
            farmer,
            base_price: registration.price_per_unit,
            current_price: registration.price_per_unit,
            expiry_date: registration.expiry_date,
            certification_hash: registration.certification_hash.clone(),
            image_hash: registration.image_hash.clone(),
            is_organic: registration.is_organic,
            current_owner: farmer,
            status: BatchStatus::Registered,
            registered_at: at,
            updated_at: at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_date
    }
}

/// One recorded change of ownership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    pub price: Price,
    pub location: String,
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

/// Ownership hand-off requested by the current owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub to: Address,
    pub new_price: Price,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
}

/// Inspection submitted by a regulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheckRequest {
    pub score: u8,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub report_hash: String,
}

/// Regulator inspection attached to a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub inspector: Address,
    pub score: u8,
    pub passed: bool,
    pub notes: String,
    pub report_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl QualityCheck {
    pub fn passes(score: u8) -> bool {
        score >= QUALITY_PASS_THRESHOLD
    }
}
