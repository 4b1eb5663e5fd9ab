//! REST API integration tests.
//!
//! Requests go through the full router (auth middleware included) with
//! `tower::ServiceExt::oneshot` over an in-memory journal.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use agrichain_ledger::access::CALLER_ADDRESS_HEADER;
use agrichain_ledger::domain::Role;

use common::*;

// ============================================================================
// Test Helpers
// ============================================================================

async fn send(
    router: &axum::Router,
    method: Method,
    uri: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("authorization", format!("ApiKey {key}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn batch_body(batch_id: &str) -> Value {
    serde_json::to_value(registration(batch_id)).unwrap()
}

async fn authed_router() -> (axum::Router, Participants) {
    let (ledger, people) = test_ledger().await;
    let router = test_router(ledger, &people, true);
    (router, people)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let (router, _) = authed_router().await;

    let (status, body) = send(&router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&router, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["journal"]["backend"], "memory");
}

#[tokio::test]
async fn test_unauthenticated_request_rejected() {
    let (router, _) = authed_router().await;

    let (status, body) = send(&router, Method::GET, "/api/v1/batches", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_REQUIRED");

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/batches",
        Some("ag_not_a_real_key"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_API_KEY");
    assert_eq!(body["error"]["numeric_code"], 1002);
}

#[tokio::test]
async fn test_batch_lifecycle_over_http() {
    let (router, people) = authed_router().await;
    let farmer = api_key_for(Role::Farmer);
    let distributor = api_key_for(Role::Distributor);
    let regulator = api_key_for(Role::Regulator);

    let (status, batch) = send(
        &router,
        Method::POST,
        "/api/v1/batches",
        Some(&farmer),
        Some(batch_body("BATCH_1")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(batch["status"], 0);
    assert_eq!(batch["current_owner"], people.farmer.to_string());

    let (status, batch) = send(
        &router,
        Method::POST,
        "/api/v1/batches/BATCH_1/transfer",
        Some(&farmer),
        Some(json!({
            "to": people.distributor.to_string(),
            "new_price": 120,
            "location": "Distribution Center A",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batch["current_owner"], people.distributor.to_string());

    let (status, batch) = send(
        &router,
        Method::POST,
        "/api/v1/batches/BATCH_1/status",
        Some(&distributor),
        Some(json!({ "status": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batch["status"], 3);

    let (status, check) = send(
        &router,
        Method::POST,
        "/api/v1/batches/BATCH_1/quality-checks",
        Some(&regulator),
        Some(json!({ "score": 60, "notes": "bruising" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(check["passed"], false);

    let (status, transfers) = send(
        &router,
        Method::GET,
        "/api/v1/batches/BATCH_1/transfers",
        Some(&farmer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(transfers.as_array().unwrap().len(), 1);

    let (_, history) = send(
        &router,
        Method::GET,
        "/api/v1/batches/BATCH_1/history",
        Some(&farmer),
        None,
    )
    .await;
    assert_eq!(history.as_array().unwrap().len(), 4);

    let (_, list) = send(&router, Method::GET, "/api/v1/batches", Some(&farmer), None).await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["batch_ids"][0], "BATCH_1");

    let uri = format!("/api/v1/accounts/{}/batches", people.distributor);
    let (_, owned) = send(&router, Method::GET, &uri, Some(&distributor), None).await;
    assert_eq!(owned["batch_ids"][0], "BATCH_1");
}

#[tokio::test]
async fn test_error_bodies_carry_stable_codes() {
    let (router, people) = authed_router().await;
    let farmer = api_key_for(Role::Farmer);
    let consumer = api_key_for(Role::Consumer);

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/batches/MISSING",
        Some(&farmer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "RESOURCE_NOT_FOUND");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/batches",
        Some(&consumer),
        Some(batch_body("B-CONSUMER")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");

    send(
        &router,
        Method::POST,
        "/api/v1/batches",
        Some(&farmer),
        Some(batch_body("B-1")),
    )
    .await;
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/batches",
        Some(&farmer),
        Some(batch_body("B-1")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_EXISTS");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/batches/B-1/transfer",
        Some(&farmer),
        Some(json!({ "to": people.farmer.to_string(), "new_price": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_FIELD_VALUE");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/batches/B-1/status",
        Some(&farmer),
        Some(json!({ "status": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATE_TRANSITION");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/batches",
        Some(&farmer),
        Some(json!({ "batch_id": "B-2" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST_BODY");
}

#[tokio::test]
async fn test_pause_returns_service_unavailable() {
    let (router, _) = authed_router().await;
    let admin = api_key_for(Role::Admin);
    let farmer = api_key_for(Role::Farmer);

    let (status, _) = send(&router, Method::POST, "/api/v1/admin/pause", Some(&farmer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&router, Method::POST, "/api/v1/admin/pause", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/batches",
        Some(&farmer),
        Some(batch_body("B-P")),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "LEDGER_PAUSED");

    let (_, summary) = send(&router, Method::GET, "/api/v1/admin/status", Some(&farmer), None).await;
    assert_eq!(summary["paused"], true);
}

#[tokio::test]
async fn test_role_endpoints() {
    let (router, people) = authed_router().await;
    let admin = api_key_for(Role::Admin);
    let newcomer = agrichain_ledger::Address::random();

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/roles/grant",
        Some(&admin),
        Some(json!({ "role": "retailer", "account": newcomer.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/v1/roles/RETAILER/accounts/{newcomer}");
    let (_, body) = send(&router, Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(body["has_role"], true);

    let (status, body) = send(&router, Method::GET, "/api/v1/roles", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let roles = body["roles"].as_array().unwrap();
    assert_eq!(roles.len(), 6);
    let retailers = roles
        .iter()
        .find(|entry| entry["role"] == "RETAILER")
        .unwrap()["accounts"]
        .as_array()
        .unwrap();
    assert_eq!(retailers.len(), 2);
    assert!(retailers.contains(&json!(newcomer.to_string())));
    assert!(retailers.contains(&json!(people.retailer.to_string())));

    // Exact membership: admins do not implicitly hold other roles
    let uri = format!("/api/v1/roles/farmer/accounts/{}", people.admin);
    let (_, body) = send(&router, Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(body["has_role"], false);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/roles/grant",
        Some(&admin),
        Some(json!({ "role": "gardener", "account": newcomer.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], "role");
}

#[tokio::test]
async fn test_user_registry_endpoints() {
    let (router, people) = authed_router().await;
    let farmer = api_key_for(Role::Farmer);
    let admin = api_key_for(Role::Admin);

    let (status, profile) = send(
        &router,
        Method::POST,
        "/api/v1/users",
        Some(&farmer),
        Some(json!({
            "name": "Alice",
            "email": "alice@example.com",
            "role": "FARMER",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(profile["role"], "FARMER");
    assert_eq!(profile["address"], people.farmer.to_string());

    let (_, count) = send(&router, Method::GET, "/api/v1/users/count", Some(&farmer), None).await;
    assert_eq!(count["total"], 1);

    // Another caller cannot edit Alice's profile
    let uri = format!("/api/v1/users/{}", people.farmer);
    let (status, _) = send(
        &router,
        Method::PUT,
        &uri,
        Some(&admin),
        Some(json!({ "name": "Mallory", "email": "m@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/v1/users/{}/deactivate", people.farmer);
    let (status, profile) = send(&router, Method::POST, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["is_active"], false);

    let uri = format!("/api/v1/users/{}/active", people.farmer);
    let (_, body) = send(&router, Method::GET, &uri, Some(&farmer), None).await;
    assert_eq!(body["is_active"], false);

    let (status, _) = send(
        &router,
        Method::GET,
        "/api/v1/users/not-an-address",
        Some(&farmer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dev_mode_reads_caller_header() {
    let (ledger, people) = test_ledger().await;
    let router = test_router(ledger, &people, false);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/batches")
        .header(CALLER_ADDRESS_HEADER, people.farmer.to_string())
        .header("content-type", "application/json")
        .body(Body::from(batch_body("B-DEV").to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let (status, body) = send(&router, Method::GET, "/api/v1/batches", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_REQUIRED");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (router, _) = authed_router().await;
    let farmer = api_key_for(Role::Farmer);
    send(
        &router,
        Method::POST,
        "/api/v1/batches",
        Some(&farmer),
        Some(batch_body("B-M")),
    )
    .await;

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("agrichain_ledger_batches_total 1"));

    let (_, json) = send(&router, Method::GET, "/metrics?format=json", None, None).await;
    assert_eq!(json["gauges"]["ledger.batches.total"], 1);
}
