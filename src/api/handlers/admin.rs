//! Emergency pause controls and ledger status.

use axum::extract::{Extension, State};
use axum::Json;

use crate::access::CallerExt;
use crate::api::error::ApiError;
use crate::ledger::LedgerSummary;
use crate::server::AppState;

/// POST /api/v1/admin/pause
pub async fn pause(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.ledger.pause(caller.address).await?;
    tracing::warn!(admin = %caller.address, "ledger paused");
    Ok(Json(serde_json::json!({ "paused": true })))
}

/// POST /api/v1/admin/unpause
pub async fn unpause(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.ledger.unpause(caller.address).await?;
    tracing::info!(admin = %caller.address, "ledger unpaused");
    Ok(Json(serde_json::json!({ "paused": false })))
}

/// GET /api/v1/admin/status - Pause flag plus aggregate counts.
pub async fn status(State(state): State<AppState>) -> Json<LedgerSummary> {
    Json(state.ledger.summary().await)
}
