//! API key authentication
//!
//! Keys are formatted as `ag_<address_prefix><random>` and stored only as
//! SHA-256 hashes. Each key authenticates as exactly one ledger address.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{AuthError, CallerContext};
use crate::domain::Address;

/// API key prefix
pub const API_KEY_PREFIX: &str = "ag_";

/// Registered API key (never holds the plaintext)
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub key_hash: String,

    /// Address the key authenticates as
    pub address: Address,

    pub active: bool,

    /// Rate limit (requests per minute)
    pub rate_limit: Option<u32>,
}

impl ApiKeyRecord {
    pub fn new(key: &str, address: Address) -> Self {
        Self {
            key_hash: ApiKeyValidator::hash_key(key),
            address,
            active: true,
            rate_limit: None,
        }
    }
}

/// In-memory API key validator
#[derive(Default)]
pub struct ApiKeyValidator {
    keys: RwLock<HashMap<String, ApiKeyRecord>>,
}

impl ApiKeyValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a validator from `<key>=<0xaddress>` pairs separated by commas
    pub fn from_config(spec: &str) -> Result<Self, String> {
        let validator = Self::new();
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, address) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected <key>=<address>, got {pair:?}"))?;
            let key = key.trim();
            if !key.starts_with(API_KEY_PREFIX) {
                return Err(format!("API keys must start with {API_KEY_PREFIX}"));
            }
            let address: Address = address
                .trim()
                .parse()
                .map_err(|e| format!("invalid address for API key: {e}"))?;
            validator.register_key(ApiKeyRecord::new(key, address));
        }
        Ok(validator)
    }

    /// Generate a new API key for an address
    ///
    /// Returns (plaintext_key, key_hash)
    pub fn generate_key(address: &Address) -> (String, String) {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        let random_bytes: [u8; 24] = rng.gen();
        let random_part = base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            random_bytes,
        );

        let address_prefix = &hex::encode(address.as_bytes())[..8];
        let plaintext_key = format!("{}{}{}", API_KEY_PREFIX, address_prefix, random_part);
        let key_hash = Self::hash_key(&plaintext_key);

        (plaintext_key, key_hash)
    }

    /// Hash an API key for storage
    pub fn hash_key(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn register_key(&self, record: ApiKeyRecord) {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        keys.insert(record.key_hash.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate an API key and return the caller it authenticates as
    pub fn validate(&self, key: &str) -> Result<CallerContext, AuthError> {
        if !key.starts_with(API_KEY_PREFIX) {
            return Err(AuthError::InvalidApiKey);
        }

        let key_hash = Self::hash_key(key);
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        let record = keys.get(&key_hash).ok_or(AuthError::InvalidApiKey)?;

        if !record.active {
            return Err(AuthError::InvalidApiKey);
        }

        Ok(CallerContext {
            address: record.address,
            rate_limit: record.rate_limit,
        })
    }

    pub fn revoke(&self, key_hash: &str) {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = keys.get_mut(key_hash) {
            record.active = false;
        }
    }
}
