//! Access control for the agrichain ledger
//!
//! Two layers live here:
//!
//! - **Role table**: which addresses hold which [`Role`]. This is ledger
//!   state, changed only through journaled grant/revoke events.
//! - **Caller authentication**: API keys that map HTTP requests to an
//!   [`Address`], plus a per-caller rate limiter.
//!
//! # Configuration
//!
//! - `AUTH_MODE`: `required` (default) or `disabled` for development
//! - `LEDGER_API_KEYS`: `<key>=<0xaddress>` pairs, comma separated
//! - `RATE_LIMIT_PER_MINUTE`: per-caller request budget

mod api_key;
mod middleware;
mod roles;

pub use api_key::*;
pub use middleware::*;
pub use roles::*;

use crate::domain::{Address, Role};

/// Whether holding `held` satisfies a check that requires `required`.
///
/// ADMIN satisfies every role check.
pub fn permits(held: Role, required: Role) -> bool {
    held == required || held == Role::Admin
}

/// Authenticated caller attached to each API request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    pub address: Address,
    /// Per-key rate limit override (requests per minute)
    pub rate_limit: Option<u32>,
}

impl CallerContext {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            rate_limit: None,
        }
    }
}

/// Authentication error
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authentication")]
    MissingAuth,

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("invalid caller address: {0}")]
    InvalidCallerAddress(String),

    #[error("rate limit exceeded")]
    RateLimited,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permits_exact_role() {
        assert!(permits(Role::Farmer, Role::Farmer));
        assert!(!permits(Role::Farmer, Role::Regulator));
        assert!(!permits(Role::Consumer, Role::Retailer));
    }

    #[test]
    fn test_admin_permits_everything() {
        for role in Role::ALL {
            assert!(permits(Role::Admin, role));
        }
        assert!(!permits(Role::Regulator, Role::Admin));
    }
}
