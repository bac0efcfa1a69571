//! services/api/src/web/collaborations.rs
//!
//! Collaboration postings, expressions of interest and team management.

use axum::{extract::State, Extension};
use campus_core::domain::{Collaboration, CollaborationDraft, CollaborationPatch};
use campus_core::services::{InterestRequest, Populated};
use campus_core::Actor;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::listing::{self, ListQuery, MineQuery, SaveRequest, SaveResponse, TrendingQuery};
use crate::web::response::ApiResponse;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AcceptInterestRequest {
    /// Role on the team; `member` when omitted.
    pub role: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/collaborations",
    tag = "collaborations",
    params(ListQuery),
    responses((status = 200, description = "Paged collaborations", body = [Collaboration]))
)]
pub async fn list_collaborations(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ApiResponse<Vec<Populated<Collaboration>>>> {
    let (filter, page) = query.into_parts();
    listing::list(&state, state.services.collaborations.as_ref(), filter, page, "Collaborations").await
}

#[utoipa::path(
    get,
    path = "/api/v1/collaborations/mine",
    tag = "collaborations",
    params(MineQuery),
    responses((status = 200, description = "Collaborations created, joined or saved by the caller", body = [Collaboration]))
)]
pub async fn my_collaborations(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<MineQuery>,
) -> ApiResult<ApiResponse<Vec<Populated<Collaboration>>>> {
    let (filter, page) = query.into_parts(&actor);
    listing::list(&state, state.services.collaborations.as_ref(), filter, page, "Your collaborations").await
}

#[utoipa::path(
    get,
    path = "/api/v1/collaborations/trending",
    tag = "collaborations",
    params(TrendingQuery),
    responses((status = 200, description = "Most engaged collaborations of the last 30 days", body = [Collaboration]))
)]
pub async fn trending_collaborations(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TrendingQuery>,
) -> ApiResult<ApiResponse<Vec<Populated<Collaboration>>>> {
    listing::trending(&state, state.services.collaborations.as_ref(), query).await
}

#[utoipa::path(
    post,
    path = "/api/v1/collaborations",
    tag = "collaborations",
    request_body = CollaborationDraft,
    responses(
        (status = 201, description = "Collaboration created", body = Collaboration),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn create_collaboration(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiJson(draft): ApiJson<CollaborationDraft>,
) -> ApiResult<ApiResponse<Collaboration>> {
    let collaboration = state.services.create_collaboration(&actor, draft).await?;
    Ok(ApiResponse::created("Collaboration created", collaboration))
}

#[utoipa::path(
    get,
    path = "/api/v1/collaborations/{id}",
    tag = "collaborations",
    params(("id" = Uuid, Path, description = "Collaboration id")),
    responses(
        (status = 200, description = "Collaboration with its creator", body = Collaboration),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_collaboration(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Populated<Collaboration>>> {
    let collaboration = state
        .services
        .view_document(state.services.collaborations.as_ref(), id)
        .await?;
    Ok(ApiResponse::ok("Collaboration", collaboration))
}

#[utoipa::path(
    put,
    path = "/api/v1/collaborations/{id}",
    tag = "collaborations",
    params(("id" = Uuid, Path, description = "Collaboration id")),
    request_body = CollaborationPatch,
    responses(
        (status = 200, description = "Collaboration updated", body = Collaboration),
        (status = 403, description = "Not the creator")
    )
)]
pub async fn update_collaboration(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<CollaborationPatch>,
) -> ApiResult<ApiResponse<Collaboration>> {
    let collaboration = state.services.update_collaboration(&actor, id, patch).await?;
    Ok(ApiResponse::ok("Collaboration updated", collaboration))
}

#[utoipa::path(
    delete,
    path = "/api/v1/collaborations/{id}",
    tag = "collaborations",
    params(("id" = Uuid, Path, description = "Collaboration id")),
    responses((status = 200, description = "Collaboration closed", body = Collaboration))
)]
pub async fn delete_collaboration(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Collaboration>> {
    let collaboration = state.services.delete_collaboration(&actor, id).await?;
    Ok(ApiResponse::ok("Collaboration closed", collaboration))
}

#[utoipa::path(
    post,
    path = "/api/v1/collaborations/{id}/interest",
    tag = "collaborations",
    params(("id" = Uuid, Path, description = "Collaboration id")),
    request_body = InterestRequest,
    responses(
        (status = 201, description = "Interest recorded", body = Collaboration),
        (status = 400, description = "Not open, team full or already a member"),
        (status = 409, description = "Interest already pending")
    )
)]
pub async fn express_interest(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    request: Option<ApiJson<InterestRequest>>,
) -> ApiResult<ApiResponse<Collaboration>> {
    let request = request.map(|ApiJson(r)| r).unwrap_or_default();
    let collaboration = state.services.express_interest(&actor, id, request).await?;
    Ok(ApiResponse::created("Interest recorded", collaboration))
}

#[utoipa::path(
    post,
    path = "/api/v1/collaborations/{id}/interest/{user_id}/accept",
    tag = "collaborations",
    params(
        ("id" = Uuid, Path, description = "Collaboration id"),
        ("user_id" = Uuid, Path, description = "Interested user")
    ),
    request_body = AcceptInterestRequest,
    responses(
        (status = 200, description = "User added to the team", body = Collaboration),
        (status = 400, description = "Team full or no pending interest"),
        (status = 403, description = "Not the creator")
    )
)]
pub async fn accept_interest(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
    request: Option<ApiJson<AcceptInterestRequest>>,
) -> ApiResult<ApiResponse<Collaboration>> {
    let role = request.and_then(|ApiJson(r)| r.role);
    let collaboration = state
        .services
        .accept_interest(&actor, id, user_id, role)
        .await?;
    Ok(ApiResponse::ok("Interest accepted", collaboration))
}

#[utoipa::path(
    post,
    path = "/api/v1/collaborations/{id}/interest/{user_id}/reject",
    tag = "collaborations",
    params(
        ("id" = Uuid, Path, description = "Collaboration id"),
        ("user_id" = Uuid, Path, description = "Interested user")
    ),
    responses((status = 200, description = "Interest rejected", body = Collaboration))
)]
pub async fn reject_interest(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Collaboration>> {
    let collaboration = state.services.reject_interest(&actor, id, user_id).await?;
    Ok(ApiResponse::ok("Interest rejected", collaboration))
}

#[utoipa::path(
    delete,
    path = "/api/v1/collaborations/{id}/members/{user_id}",
    tag = "collaborations",
    params(
        ("id" = Uuid, Path, description = "Collaboration id"),
        ("user_id" = Uuid, Path, description = "Team member")
    ),
    responses((status = 200, description = "Member removed", body = Collaboration))
)]
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Collaboration>> {
    let collaboration = state.services.remove_member(&actor, id, user_id).await?;
    Ok(ApiResponse::ok("Member removed", collaboration))
}

#[utoipa::path(
    post,
    path = "/api/v1/collaborations/{id}/leave",
    tag = "collaborations",
    params(("id" = Uuid, Path, description = "Collaboration id")),
    responses(
        (status = 200, description = "Left the team", body = Collaboration),
        (status = 400, description = "Creators cannot leave their own collaboration")
    )
)]
pub async fn leave_collaboration(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Collaboration>> {
    let collaboration = state.services.leave_collaboration(&actor, id).await?;
    Ok(ApiResponse::ok("Left the collaboration", collaboration))
}

#[utoipa::path(
    post,
    path = "/api/v1/collaborations/{id}/save",
    tag = "collaborations",
    params(("id" = Uuid, Path, description = "Collaboration id")),
    request_body(content = SaveRequest, description = "Omit the body to toggle"),
    responses((status = 200, description = "Save state after the call", body = SaveResponse))
)]
pub async fn save_collaboration(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    request: Option<ApiJson<SaveRequest>>,
) -> ApiResult<ApiResponse<SaveResponse>> {
    listing::save(
        &state,
        state.services.collaborations.as_ref(),
        &actor,
        id,
        request.map(|ApiJson(r)| r),
    )
    .await
}
