//! REST API endpoints for the agrichain ledger.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{admin, batches, roles, users};
use crate::server::AppState;

/// Build the `/api` router.
///
/// Every route expects a [`crate::access::CallerExt`] inserted by the auth
/// middleware layered on top of this router.
pub fn router() -> Router<AppState> {
    Router::new()
        // Batch lifecycle
        .route(
            "/v1/batches",
            post(batches::register_batch).get(batches::list_batches),
        )
        .route("/v1/batches/:batch_id", get(batches::get_batch))
        .route("/v1/batches/:batch_id/exists", get(batches::batch_exists))
        .route("/v1/batches/:batch_id/status", post(batches::update_status))
        .route(
            "/v1/batches/:batch_id/transfer",
            post(batches::transfer_batch),
        )
        .route("/v1/batches/:batch_id/price", post(batches::update_price))
        .route("/v1/batches/:batch_id/sell", post(batches::mark_as_sold))
        .route(
            "/v1/batches/:batch_id/quality-checks",
            get(batches::get_quality_checks).post(batches::add_quality_check),
        )
        .route(
            "/v1/batches/:batch_id/transfers",
            get(batches::get_transfer_history),
        )
        .route(
            "/v1/batches/:batch_id/history",
            get(batches::get_batch_history),
        )
        .route(
            "/v1/accounts/:address/batches",
            get(batches::get_account_batches),
        )
        // Access control
        .route("/v1/accounts/:address/roles", get(roles::roles_of))
        .route("/v1/roles", get(roles::list_roles))
        .route("/v1/roles/grant", post(roles::grant_role))
        .route("/v1/roles/revoke", post(roles::revoke_role))
        .route(
            "/v1/roles/:role/accounts/:address",
            get(roles::has_role),
        )
        .route("/v1/roles/:role/users", get(users::users_by_role))
        .route("/v1/admin/pause", post(admin::pause))
        .route("/v1/admin/unpause", post(admin::unpause))
        .route("/v1/admin/status", get(admin::status))
        // User registry
        .route(
            "/v1/users",
            post(users::register_user).get(users::list_users),
        )
        .route("/v1/users/count", get(users::count_users))
        .route(
            "/v1/users/:address",
            get(users::get_user).put(users::update_profile),
        )
        .route("/v1/users/:address/role", axum::routing::put(users::update_role))
        .route(
            "/v1/users/:address/deactivate",
            post(users::deactivate_user),
        )
        .route(
            "/v1/users/:address/reactivate",
            post(users::reactivate_user),
        )
        .route("/v1/users/:address/active", get(users::is_active_user))
}
