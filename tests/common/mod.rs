//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};

use agrichain_ledger::access::{ApiKeyRecord, ApiKeyValidator, AuthMiddlewareState, Authenticator};
use agrichain_ledger::domain::{Address, BatchId, BatchRegistration, Role, UserRegistration};
use agrichain_ledger::infra::{Journal, MemoryJournal};
use agrichain_ledger::ledger::Ledger;
use agrichain_ledger::metrics::MetricsRegistry;
use agrichain_ledger::server::{build_router, AppState};

/// Participants with their access roles already granted
pub struct Participants {
    pub admin: Address,
    pub farmer: Address,
    pub distributor: Address,
    pub retailer: Address,
    pub regulator: Address,
    pub consumer: Address,
}

impl Participants {
    pub fn random() -> Self {
        Self {
            admin: Address::random(),
            farmer: Address::random(),
            distributor: Address::random(),
            retailer: Address::random(),
            regulator: Address::random(),
            consumer: Address::random(),
        }
    }

    pub fn all(&self) -> [(Address, Role); 6] {
        [
            (self.admin, Role::Admin),
            (self.farmer, Role::Farmer),
            (self.distributor, Role::Distributor),
            (self.retailer, Role::Retailer),
            (self.regulator, Role::Regulator),
            (self.consumer, Role::Consumer),
        ]
    }
}

/// Open a ledger over `journal` and grant every participant its role
pub async fn ledger_with(journal: Arc<dyn Journal>, people: &Participants) -> Ledger {
    let ledger = Ledger::open(journal, Some(people.admin), Arc::new(MetricsRegistry::new()))
        .await
        .expect("open ledger");
    for (account, role) in people.all() {
        if role != Role::Admin {
            ledger
                .grant_role(people.admin, role, account)
                .await
                .expect("grant role");
        }
    }
    ledger
}

/// In-memory ledger with a fresh set of participants
pub async fn test_ledger() -> (Ledger, Participants) {
    let people = Participants::random();
    let ledger = ledger_with(Arc::new(MemoryJournal::new()), &people).await;
    (ledger, people)
}

/// A valid registration expiring in 30 days
pub fn registration(batch_id: &str) -> BatchRegistration {
    BatchRegistration {
        batch_id: BatchId::from(batch_id),
        produce_type: "Tomatoes".to_string(),
        variety: "Roma".to_string(),
        quantity: 500,
        origin_farm: "Green Valley Farm".to_string(),
        price_per_unit: 100,
        expiry_date: Utc::now() + Duration::days(30),
        certification_hash: "QmCert".to_string(),
        image_hash: "QmImage".to_string(),
        is_organic: true,
    }
}

pub fn user_registration(name: &str, role: Role) -> UserRegistration {
    UserRegistration {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone: "+1-555-0100".to_string(),
        physical_address: "1 Farm Road".to_string(),
        role: role.id(),
        profile_hash: String::new(),
    }
}

/// API key issued to each participant by [`test_router`]
pub fn api_key_for(role: Role) -> String {
    format!("ag_test_{}", role.as_str().to_lowercase())
}

/// Router over `ledger` with one API key per participant
pub fn test_router(ledger: Ledger, people: &Participants, require_auth: bool) -> axum::Router {
    let validator = Arc::new(ApiKeyValidator::new());
    for (account, role) in people.all() {
        validator.register_key(ApiKeyRecord::new(&api_key_for(role), account));
    }

    let auth_state = AuthMiddlewareState {
        authenticator: Arc::new(Authenticator::new(validator)),
        require_auth,
        rate_limiter: None,
    };

    build_router(auth_state, None).with_state(AppState::new(Arc::new(ledger)))
}
