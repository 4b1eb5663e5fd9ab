//! Role administration handlers.

use axum::extract::{Extension, Path, State};
use axum::Json;

use crate::access::CallerExt;
use crate::api::error::ApiError;
use crate::api::types::RoleChangeRequest;
use crate::api::utils::{parse_address, parse_role, ApiJson};
use crate::server::AppState;

/// POST /api/v1/roles/grant - Admin only; granting a held role is a no-op.
pub async fn grant_role(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    ApiJson(request): ApiJson<RoleChangeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let role = parse_role(&request.role)?;
    state
        .ledger
        .grant_role(caller.address, role, request.account)
        .await?;
    Ok(Json(serde_json::json!({
        "role": role,
        "account": request.account,
        "has_role": true,
    })))
}

/// POST /api/v1/roles/revoke
pub async fn revoke_role(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    ApiJson(request): ApiJson<RoleChangeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let role = parse_role(&request.role)?;
    state
        .ledger
        .revoke_role(caller.address, role, request.account)
        .await?;
    Ok(Json(serde_json::json!({
        "role": role,
        "account": request.account,
        "has_role": false,
    })))
}

/// GET /api/v1/roles/:role/accounts/:address - Exact membership, no admin override.
pub async fn has_role(
    State(state): State<AppState>,
    Path((role, address)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let role = parse_role(&role)?;
    let account = parse_address(&address, "address")?;
    let has_role = state.ledger.has_role(role, &account).await;
    Ok(Json(serde_json::json!({
        "role": role,
        "role_id": role.id(),
        "account": account,
        "has_role": has_role,
    })))
}

/// GET /api/v1/roles - Every role with its current holders.
pub async fn list_roles(State(state): State<AppState>) -> Json<serde_json::Value> {
    let roles = state.ledger.role_members().await;
    Json(serde_json::json!({ "roles": roles }))
}

/// GET /api/v1/accounts/:address/roles
pub async fn roles_of(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&address, "address")?;
    let roles = state.ledger.roles_of(&account).await;
    Ok(Json(serde_json::json!({
        "account": account,
        "roles": roles,
    })))
}
