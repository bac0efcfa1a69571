//! services/api/src/web/admin.rs
//!
//! Admin-only account management and platform counters.

use axum::{extract::State, Extension};
use campus_core::domain::{Role, User};
use campus_core::services::PlatformOverview;
use campus_core::Actor;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::web::extract::{ApiJson, ApiPath};
use crate::web::response::ApiResponse;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRequest {
    pub is_active: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/overview",
    tag = "admin",
    responses(
        (status = 200, description = "Platform-wide counters", body = PlatformOverview),
        (status = 403, description = "Admins only")
    )
)]
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<ApiResponse<PlatformOverview>> {
    let overview = state.services.platform_overview(&actor).await?;
    Ok(ApiResponse::ok("Platform overview", overview))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/role",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role changed", body = User),
        (status = 400, description = "Admins cannot demote themselves"),
        (status = 403, description = "Admins only")
    )
)]
pub async fn set_role(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<RoleRequest>,
) -> ApiResult<ApiResponse<User>> {
    let user = state.services.set_user_role(&actor, id, request.role).await?;
    Ok(ApiResponse::ok("Role updated", user))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}/active",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = ActiveRequest,
    responses(
        (status = 200, description = "Account activated or deactivated", body = User),
        (status = 403, description = "Admins only")
    )
)]
pub async fn set_active(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ActiveRequest>,
) -> ApiResult<ApiResponse<User>> {
    let user = state
        .services
        .set_user_active(&actor, id, request.is_active)
        .await?;
    let message = if request.is_active { "Account activated" } else { "Account deactivated" };
    Ok(ApiResponse::ok(message, user))
}
