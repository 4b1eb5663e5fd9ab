//! Health, readiness and metrics handlers
//!
//! These routes sit outside the authenticated `/api` tree so probes and
//! scrapers need no credentials.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

const SERVICE_NAME: &str = "agrichain-ledger";

/// Response for the basic health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Journal backend status reported by the readiness probe
#[derive(Debug, Serialize)]
pub struct JournalStatus {
    pub backend: &'static str,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_sequence: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
}

/// Basic health check endpoint.
///
/// Performs no deep checks. Use this for liveness probes.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness check endpoint.
///
/// Reads the journal head so a broken database connection fails the probe.
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    let journal = state.ledger.journal();
    let start = std::time::Instant::now();
    let head = journal.head().await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    match head {
        Ok(head_sequence) => Json(serde_json::json!({
            "status": "ready",
            "journal": JournalStatus {
                backend: journal.backend(),
                status: HealthStatus::Healthy,
                head_sequence: Some(head_sequence),
                message: None,
                response_time_ms,
            },
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "not_ready",
                    "journal": JournalStatus {
                        backend: journal.backend(),
                        status: HealthStatus::Unhealthy,
                        head_sequence: None,
                        message: Some(e.to_string()),
                        response_time_ms,
                    },
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    /// `json` for the JSON snapshot; Prometheus text otherwise
    pub format: Option<String>,
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>, Query(query): Query<MetricsQuery>) -> Response {
    if query.format.as_deref() == Some("json") {
        return Json(state.metrics.to_json().await).into_response();
    }

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus().await,
    )
        .into_response()
}
