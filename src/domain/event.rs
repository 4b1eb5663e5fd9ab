//! Ledger events and journal entries
//!
//! Every accepted state change is expressed as exactly one [`LedgerEvent`].
//! Events are journaled before they are applied, and replaying the journal
//! in sequence order rebuilds the full ledger state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{
    Address, BatchId, BatchRegistration, BatchStatus, Hash256, Price, ProfileUpdate, Role,
    UserRegistration,
};

/// State change accepted by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Genesis entry of a fresh journal
    LedgerInitialized { admin: Address },

    RoleGranted { role: Role, account: Address },
    RoleRevoked { role: Role, account: Address },
    Paused,
    Unpaused,

    BatchRegistered { registration: BatchRegistration },
    BatchStatusUpdated {
        batch_id: BatchId,
        from: BatchStatus,
        to: BatchStatus,
    },
    BatchTransferred {
        batch_id: BatchId,
        from: Address,
        to: Address,
        price: Price,
        location: String,
        notes: String,
    },
    PriceUpdated {
        batch_id: BatchId,
        old_price: Price,
        new_price: Price,
    },
    BatchSold {
        batch_id: BatchId,
        seller: Address,
        buyer: Address,
        final_price: Price,
    },
    QualityCheckAdded {
        batch_id: BatchId,
        score: u8,
        passed: bool,
        notes: String,
        report_hash: String,
    },

    UserRegistered { registration: UserRegistration },
    UserProfileUpdated { update: ProfileUpdate },
    UserRoleUpdated {
        account: Address,
        old_role: Role,
        new_role: Role,
    },
    UserDeactivated { account: Address },
    UserReactivated { account: Address },
}

impl LedgerEvent {
    // Event type names as stored in the journal
    pub const LEDGER_INITIALIZED: &'static str = "ledger.initialized";
    pub const ROLE_GRANTED: &'static str = "role.granted";
    pub const ROLE_REVOKED: &'static str = "role.revoked";
    pub const LEDGER_PAUSED: &'static str = "ledger.paused";
    pub const LEDGER_UNPAUSED: &'static str = "ledger.unpaused";
    pub const BATCH_REGISTERED: &'static str = "batch.registered";
    pub const BATCH_STATUS_UPDATED: &'static str = "batch.status_updated";
    pub const BATCH_TRANSFERRED: &'static str = "batch.transferred";
    pub const BATCH_PRICE_UPDATED: &'static str = "batch.price_updated";
    pub const BATCH_SOLD: &'static str = "batch.sold";
    pub const QUALITY_CHECK_ADDED: &'static str = "batch.quality_check_added";
    pub const USER_REGISTERED: &'static str = "user.registered";
    pub const USER_PROFILE_UPDATED: &'static str = "user.profile_updated";
    pub const USER_ROLE_UPDATED: &'static str = "user.role_updated";
    pub const USER_DEACTIVATED: &'static str = "user.deactivated";
    pub const USER_REACTIVATED: &'static str = "user.reactivated";

    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::LedgerInitialized { .. } => Self::LEDGER_INITIALIZED,
            LedgerEvent::RoleGranted { .. } => Self::ROLE_GRANTED,
            LedgerEvent::RoleRevoked { .. } => Self::ROLE_REVOKED,
            LedgerEvent::Paused => Self::LEDGER_PAUSED,
            LedgerEvent::Unpaused => Self::LEDGER_UNPAUSED,
            LedgerEvent::BatchRegistered { .. } => Self::BATCH_REGISTERED,
            LedgerEvent::BatchStatusUpdated { .. } => Self::BATCH_STATUS_UPDATED,
            LedgerEvent::BatchTransferred { .. } => Self::BATCH_TRANSFERRED,
            LedgerEvent::PriceUpdated { .. } => Self::BATCH_PRICE_UPDATED,
            LedgerEvent::BatchSold { .. } => Self::BATCH_SOLD,
            LedgerEvent::QualityCheckAdded { .. } => Self::QUALITY_CHECK_ADDED,
            LedgerEvent::UserRegistered { .. } => Self::USER_REGISTERED,
            LedgerEvent::UserProfileUpdated { .. } => Self::USER_PROFILE_UPDATED,
            LedgerEvent::UserRoleUpdated { .. } => Self::USER_ROLE_UPDATED,
            LedgerEvent::UserDeactivated { .. } => Self::USER_DEACTIVATED,
            LedgerEvent::UserReactivated { .. } => Self::USER_REACTIVATED,
        }
    }

    /// Batch this event touches, if any
    pub fn batch_id(&self) -> Option<&BatchId> {
        match self {
            LedgerEvent::BatchRegistered { registration } => Some(&registration.batch_id),
            LedgerEvent::BatchStatusUpdated { batch_id, .. }
            | LedgerEvent::BatchTransferred { batch_id, .. }
            | LedgerEvent::PriceUpdated { batch_id, .. }
            | LedgerEvent::BatchSold { batch_id, .. }
            | LedgerEvent::QualityCheckAdded { batch_id, .. } => Some(batch_id),
            _ => None,
        }
    }
}

/// Event ready to be appended; the journal assigns the sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJournalEntry {
    pub entry_id: Uuid,
    pub actor: Address,
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}

impl NewJournalEntry {
    pub fn new(actor: Address, recorded_at: DateTime<Utc>, event: LedgerEvent) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            actor,
            recorded_at,
            event,
        }
    }

    /// Attach the journal-assigned sequence number
    pub fn into_entry(self, sequence: u64) -> JournalEntry {
        let mut entry = JournalEntry {
            sequence,
            entry_id: self.entry_id,
            actor: self.actor,
            recorded_at: self.recorded_at,
            event: self.event,
            payload_hash: [0u8; 32],
        };
        entry.payload_hash = entry.compute_payload_hash();
        entry
    }
}

/// Journaled event with its canonical position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Monotonic, gap-free position starting at 1
    pub sequence: u64,
    pub entry_id: Uuid,
    /// Address whose call produced the event
    pub actor: Address,
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
    #[serde(with = "hash256_hex")]
    pub payload_hash: Hash256,
}

impl JournalEntry {
    /// SHA-256 over the whole envelope.
    ///
    /// Covers: sequence | entry_id | actor | recorded_at (seconds, nanos) |
    /// event JSON. Replay derives ownership from `actor`, so it must be
    /// bound to the event it produced.
    pub fn compute_payload_hash(&self) -> Hash256 {
        let event_bytes = serde_json::to_vec(&self.event).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(self.entry_id.as_bytes());
        hasher.update(self.actor.as_bytes());
        hasher.update(self.recorded_at.timestamp().to_be_bytes());
        hasher.update(self.recorded_at.timestamp_subsec_nanos().to_be_bytes());
        hasher.update(&event_bytes);
        hasher.finalize().into()
    }

    pub fn verify_payload_hash(&self) -> bool {
        self.compute_payload_hash() == self.payload_hash
    }
}

/// Serde module for serializing Hash256 as hex strings
pub mod hash256_hex {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes for Hash256"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_batch_id() {
        let event = LedgerEvent::PriceUpdated {
            batch_id: BatchId::from("BATCH_1"),
            old_price: 10,
            new_price: 12,
        };
        assert_eq!(event.event_type(), "batch.price_updated");
        assert_eq!(event.batch_id().unwrap().as_str(), "BATCH_1");

        let event = LedgerEvent::Paused;
        assert_eq!(event.event_type(), "ledger.paused");
        assert!(event.batch_id().is_none());
    }

    #[test]
    fn test_event_serde_is_tagged() {
        let event = LedgerEvent::UserDeactivated {
            account: Address([1u8; 20]),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "user_deactivated");

        let back: LedgerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_journal_entry_payload_hash() {
        let entry = NewJournalEntry::new(Address([2u8; 20]), Utc::now(), LedgerEvent::Unpaused)
            .into_entry(7);
        assert_eq!(entry.sequence, 7);
        assert!(entry.verify_payload_hash());

        let mut tampered = entry.clone();
        tampered.event = LedgerEvent::Paused;
        assert!(!tampered.verify_payload_hash());
    }

    #[test]
    fn test_payload_hash_binds_envelope() {
        let entry = NewJournalEntry::new(Address([2u8; 20]), Utc::now(), LedgerEvent::Unpaused)
            .into_entry(7);

        let mut other_actor = entry.clone();
        other_actor.actor = Address([3u8; 20]);
        assert!(!other_actor.verify_payload_hash());

        let mut other_time = entry.clone();
        other_time.recorded_at = entry.recorded_at + chrono::Duration::seconds(1);
        assert!(!other_time.verify_payload_hash());

        let mut other_sequence = entry.clone();
        other_sequence.sequence = 8;
        assert!(!other_sequence.verify_payload_hash());

        let mut other_id = entry;
        other_id.entry_id = Uuid::new_v4();
        assert!(!other_id.verify_payload_hash());
    }
}
