//! User registry handlers.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::access::CallerExt;
use crate::api::error::{ApiError, ErrorCode};
use crate::api::types::{RegisterUserRequest, UserListResponse, UserRoleRequest};
use crate::api::utils::{parse_address, parse_role, parse_role_id, ApiJson};
use crate::domain::{ProfileUpdate, UserProfile};
use crate::server::AppState;

/// POST /api/v1/users - The caller registers their own profile.
pub async fn register_user(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    ApiJson(request): ApiJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let registration = request.into_registration()?;
    let profile = state
        .ledger
        .register_user(caller.address, registration)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /api/v1/users - Registered addresses in registration order.
pub async fn list_users(State(state): State<AppState>) -> Json<UserListResponse> {
    let users = state.ledger.get_all_users().await;
    Json(UserListResponse {
        total: users.len() as u64,
        users,
    })
}

/// GET /api/v1/users/count
pub async fn count_users(State(state): State<AppState>) -> Json<serde_json::Value> {
    let total = state.ledger.get_total_users().await;
    Json(serde_json::json!({ "total": total }))
}

/// GET /api/v1/users/:address
pub async fn get_user(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let account = parse_address(&address, "address")?;
    Ok(Json(state.ledger.get_user(&account).await?))
}

/// PUT /api/v1/users/:address - Users may only edit their own profile.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    Path(address): Path<String>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<Json<UserProfile>, ApiError> {
    let account = parse_address(&address, "address")?;
    if account != caller.address {
        return Err(ApiError::new(
            ErrorCode::InsufficientPermissions,
            "users can only update their own profile",
        )
        .with_resource_id(account.to_string()));
    }

    let profile = state
        .ledger
        .update_user_profile(caller.address, update)
        .await?;
    Ok(Json(profile))
}

/// PUT /api/v1/users/:address/role - Admin only.
pub async fn update_role(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    Path(address): Path<String>,
    ApiJson(request): ApiJson<UserRoleRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let account = parse_address(&address, "address")?;
    let role_id = parse_role_id(&request.role)?;
    let profile = state
        .ledger
        .update_user_role(caller.address, account, role_id)
        .await?;
    Ok(Json(profile))
}

/// POST /api/v1/users/:address/deactivate
pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    Path(address): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let account = parse_address(&address, "address")?;
    Ok(Json(
        state.ledger.deactivate_user(caller.address, account).await?,
    ))
}

/// POST /api/v1/users/:address/reactivate
pub async fn reactivate_user(
    State(state): State<AppState>,
    Extension(CallerExt(caller)): Extension<CallerExt>,
    Path(address): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let account = parse_address(&address, "address")?;
    Ok(Json(
        state.ledger.reactivate_user(caller.address, account).await?,
    ))
}

/// GET /api/v1/users/:address/active
pub async fn is_active_user(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = parse_address(&address, "address")?;
    let active = state.ledger.is_active_user(&account).await;
    Ok(Json(serde_json::json!({ "address": account, "is_active": active })))
}

/// GET /api/v1/roles/:role/users - Active users registered with the role.
pub async fn users_by_role(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let role = parse_role(&role)?;
    Ok(Json(state.ledger.get_users_by_role(role).await))
}
