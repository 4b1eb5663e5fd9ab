//! Core identifier types for the agrichain ledger
//!
//! Addresses and role ids are fixed-width byte arrays rendered as
//! `0x`-prefixed lowercase hex on the wire.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// 32-byte hash (SHA-256)
pub type Hash256 = [u8; 32];

/// Error produced when parsing an identifier from hex
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

fn decode_hex_0x<const N: usize>(s: &str) -> Result<[u8; N], IdParseError> {
    let hex_str = s.trim().strip_prefix("0x").unwrap_or(s.trim());
    let bytes = hex::decode(hex_str).map_err(|e| IdParseError::InvalidHex(e.to_string()))?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| IdParseError::InvalidLength {
        expected: N,
        actual,
    })
}

/// Account address of a supply-chain participant (20 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address, never a valid transfer recipient.
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Generate a random address (test fixtures, dev tooling)
    pub fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Self(rng.gen())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_0x::<20>(s).map(Self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Deterministic role identifier: SHA-256 of the role constant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId(pub Hash256);

impl RoleId {
    /// Derive a role id from its constant name (e.g. `FARMER_ROLE`).
    pub fn from_name(name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &Hash256 {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for RoleId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex_0x::<32>(s).map(Self)
    }
}

impl Serialize for RoleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RoleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Externally supplied batch identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BatchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BatchId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Price per unit in the smallest currency denomination.
pub type Price = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip_display() {
        let addr: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        assert_eq!(addr.to_string(), "0x00000000000000000000000000000000000000aa");
        assert!(!addr.is_zero());
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn test_address_accepts_missing_prefix_and_rejects_bad_length() {
        let addr: Address = "1111111111111111111111111111111111111111".parse().unwrap();
        assert_eq!(addr.0, [0x11; 20]);

        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            IdParseError::InvalidLength {
                expected: 20,
                actual: 2
            }
        );
        assert!(matches!(
            "0xzz".parse::<Address>(),
            Err(IdParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_role_id_is_deterministic() {
        let a = RoleId::from_name("FARMER_ROLE");
        let b = RoleId::from_name("FARMER_ROLE");
        let c = RoleId::from_name("RETAILER_ROLE");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let parsed: RoleId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }

    #[test]
    fn test_address_serde_as_hex_string() {
        let addr = Address([0xab; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_batch_id_empty() {
        assert!(BatchId::new("   ").is_empty());
        assert!(!BatchId::from("BATCH_1").is_empty());
    }
}
