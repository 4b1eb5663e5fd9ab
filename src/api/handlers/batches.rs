//! Batch lifecycle handlers.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::access::CallerExt;
use crate::api::error::ApiError;
use crate::api::types::{BatchListResponse, PriceUpdateRequest, SellRequest, StatusUpdateRequest};
use crate::api::utils::{parse_address, ApiJson};
use crate::domain::{
    Batch, BatchId, BatchRegistration, JournalEntry, QualityCheck, QualityCheckRequest,
    TransferRecord, TransferRequest,
};
use crate::server::AppState;

/// POST /api/v1/batches - Register a batch owned by the caller.
pub async fn register_batch(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    ApiJson(registration): ApiJson<BatchRegistration>,
) -> Result<(StatusCode, Json<Batch>), ApiError> {
    let batch = state
        .ledger
        .register_batch(caller.address, registration)
        .await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// GET /api/v1/batches - List every batch id in registration order.
pub async fn list_batches(State(state): State<AppState>) -> Json<BatchListResponse> {
    let batch_ids = state.ledger.get_all_batch_ids().await;
    Json(BatchListResponse {
        total: batch_ids.len() as u64,
        batch_ids,
    })
}

/// GET /api/v1/batches/:batch_id
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<Batch>, ApiError> {
    let batch = state.ledger.get_batch(&BatchId::from(batch_id)).await?;
    Ok(Json(batch))
}

/// GET /api/v1/batches/:batch_id/exists
pub async fn batch_exists(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Json<serde_json::Value> {
    let batch_id = BatchId::from(batch_id);
    let exists = state.ledger.batch_exists(&batch_id).await;
    Json(serde_json::json!({ "batch_id": batch_id, "exists": exists }))
}

/// POST /api/v1/batches/:batch_id/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    Path(batch_id): Path<String>,
    ApiJson(request): ApiJson<StatusUpdateRequest>,
) -> Result<Json<Batch>, ApiError> {
    let batch = state
        .ledger
        .update_batch_status(caller.address, &BatchId::from(batch_id), request.status)
        .await?;
    Ok(Json(batch))
}

/// POST /api/v1/batches/:batch_id/transfer
pub async fn transfer_batch(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    Path(batch_id): Path<String>,
    ApiJson(request): ApiJson<TransferRequest>,
) -> Result<Json<Batch>, ApiError> {
    let batch = state
        .ledger
        .transfer_batch(caller.address, &BatchId::from(batch_id), request)
        .await?;
    Ok(Json(batch))
}

/// POST /api/v1/batches/:batch_id/price
pub async fn update_price(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    Path(batch_id): Path<String>,
    ApiJson(request): ApiJson<PriceUpdateRequest>,
) -> Result<Json<Batch>, ApiError> {
    let batch = state
        .ledger
        .update_price(caller.address, &BatchId::from(batch_id), request.new_price)
        .await?;
    Ok(Json(batch))
}

/// POST /api/v1/batches/:batch_id/sell
pub async fn mark_as_sold(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    Path(batch_id): Path<String>,
    ApiJson(request): ApiJson<SellRequest>,
) -> Result<Json<Batch>, ApiError> {
    let batch = state
        .ledger
        .mark_as_sold(
            caller.address,
            &BatchId::from(batch_id),
            request.buyer,
            request.final_price,
        )
        .await?;
    Ok(Json(batch))
}

/// POST /api/v1/batches/:batch_id/quality-checks
pub async fn add_quality_check(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    Path(batch_id): Path<String>,
    ApiJson(request): ApiJson<QualityCheckRequest>,
) -> Result<(StatusCode, Json<QualityCheck>), ApiError> {
    let check = state
        .ledger
        .add_quality_check(caller.address, &BatchId::from(batch_id), request)
        .await?;
    Ok((StatusCode::CREATED, Json(check)))
}

/// GET /api/v1/batches/:batch_id/quality-checks
pub async fn get_quality_checks(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<Vec<QualityCheck>>, ApiError> {
    let checks = state
        .ledger
        .get_quality_checks(&BatchId::from(batch_id))
        .await?;
    Ok(Json(checks))
}

/// GET /api/v1/batches/:batch_id/transfers
pub async fn get_transfer_history(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<Vec<TransferRecord>>, ApiError> {
    let transfers = state
        .ledger
        .get_transfer_history(&BatchId::from(batch_id))
        .await?;
    Ok(Json(transfers))
}

/// GET /api/v1/batches/:batch_id/history - Journal entries that touched the batch.
pub async fn get_batch_history(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    let history = state
        .ledger
        .get_batch_history(&BatchId::from(batch_id))
        .await?;
    Ok(Json(history))
}

/// GET /api/v1/accounts/:address/batches
pub async fn get_account_batches(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<BatchListResponse>, ApiError> {
    let account = parse_address(&address, "address")?;
    let batch_ids = state.ledger.get_user_batches(&account).await;
    Ok(Json(BatchListResponse {
        total: batch_ids.len() as u64,
        batch_ids,
    }))
}
