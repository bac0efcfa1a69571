//! services/api/src/web/opportunities.rs
//!
//! Opportunity postings, applications and skill matching.

use axum::{extract::State, Extension};
use campus_core::domain::{ApplicationStatus, Opportunity, OpportunityDraft, OpportunityPatch};
use campus_core::matching::{Recommendation, SkillMatch};
use campus_core::services::{ApplicantView, ApplicationRequest, ApplicationState, Populated};
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

#[derive(Deserialize, ToSchema)]
pub struct ApplicantStatusRequest {
    pub status: ApplicationStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct OfferResponseRequest {
    pub accept: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/opportunities",
    tag = "opportunities",
    params(ListQuery),
    responses((status = 200, description = "Paged opportunities", body = [Opportunity]))
)]
pub async fn list_opportunities(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ApiResponse<Vec<Populated<Opportunity>>>> {
    let (filter, page) = query.into_parts();
    listing::list(&state, state.services.opportunities.as_ref(), filter, page, "Opportunities").await
}

#[utoipa::path(
    get,
    path = "/api/v1/opportunities/mine",
    tag = "opportunities",
    params(MineQuery),
    responses((status = 200, description = "Opportunities posted, applied to or saved by the caller", body = [Opportunity]))
)]
pub async fn my_opportunities(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<MineQuery>,
) -> ApiResult<ApiResponse<Vec<Populated<Opportunity>>>> {
    let (filter, page) = query.into_parts(&actor);
    listing::list(&state, state.services.opportunities.as_ref(), filter, page, "Your opportunities").await
}

#[utoipa::path(
    get,
    path = "/api/v1/opportunities/trending",
    tag = "opportunities",
    params(TrendingQuery),
    responses((status = 200, description = "Most engaged postings of the last 30 days", body = [Opportunity]))
)]
pub async fn trending_opportunities(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TrendingQuery>,
) -> ApiResult<ApiResponse<Vec<Populated<Opportunity>>>> {
    listing::trending(&state, state.services.opportunities.as_ref(), query).await
}

#[utoipa::path(
    get,
    path = "/api/v1/opportunities/recommended",
    tag = "opportunities",
    responses((status = 200, description = "Open postings ranked by skill overlap", body = [Recommendation]))
)]
pub async fn recommended_opportunities(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<ApiResponse<Vec<Recommendation>>> {
    let recommendations = state.services.recommend_opportunities(&actor).await?;
    Ok(ApiResponse::ok("Recommended opportunities", recommendations))
}

#[utoipa::path(
    post,
    path = "/api/v1/opportunities",
    tag = "opportunities",
    request_body = OpportunityDraft,
    responses(
        (status = 201, description = "Opportunity created", body = Opportunity),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn create_opportunity(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiJson(draft): ApiJson<OpportunityDraft>,
) -> ApiResult<ApiResponse<Opportunity>> {
    let opportunity = state.services.create_opportunity(&actor, draft).await?;
    Ok(ApiResponse::created("Opportunity created", opportunity))
}

#[utoipa::path(
    get,
    path = "/api/v1/opportunities/{id}",
    tag = "opportunities",
    params(("id" = Uuid, Path, description = "Opportunity id")),
    responses(
        (status = 200, description = "Opportunity with its poster", body = Opportunity),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_opportunity(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Populated<Opportunity>>> {
    let opportunity = state
        .services
        .view_document(state.services.opportunities.as_ref(), id)
        .await?;
    Ok(ApiResponse::ok("Opportunity", opportunity))
}

#[utoipa::path(
    put,
    path = "/api/v1/opportunities/{id}",
    tag = "opportunities",
    params(("id" = Uuid, Path, description = "Opportunity id")),
    request_body = OpportunityPatch,
    responses(
        (status = 200, description = "Opportunity updated", body = Opportunity),
        (status = 403, description = "Not the poster")
    )
)]
pub async fn update_opportunity(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<OpportunityPatch>,
) -> ApiResult<ApiResponse<Opportunity>> {
    let opportunity = state.services.update_opportunity(&actor, id, patch).await?;
    Ok(ApiResponse::ok("Opportunity updated", opportunity))
}

#[utoipa::path(
    delete,
    path = "/api/v1/opportunities/{id}",
    tag = "opportunities",
    params(("id" = Uuid, Path, description = "Opportunity id")),
    responses((status = 200, description = "Opportunity deactivated", body = Opportunity))
)]
pub async fn delete_opportunity(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Opportunity>> {
    let opportunity = state.services.delete_opportunity(&actor, id).await?;
    Ok(ApiResponse::ok("Opportunity deactivated", opportunity))
}

#[utoipa::path(
    post,
    path = "/api/v1/opportunities/{id}/apply",
    tag = "opportunities",
    params(("id" = Uuid, Path, description = "Opportunity id")),
    request_body = ApplicationRequest,
    responses(
        (status = 201, description = "Application submitted", body = Opportunity),
        (status = 400, description = "Deadline passed or posting not active"),
        (status = 403, description = "Posters cannot apply to their own posting"),
        (status = 409, description = "Already applied")
    )
)]
pub async fn apply(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    request: Option<ApiJson<ApplicationRequest>>,
) -> ApiResult<ApiResponse<Opportunity>> {
    let request = request.map(|ApiJson(r)| r).unwrap_or_default();
    let opportunity = state
        .services
        .apply_to_opportunity(&actor, id, request)
        .await?;
    Ok(ApiResponse::created("Application submitted", opportunity))
}

#[utoipa::path(
    get,
    path = "/api/v1/opportunities/{id}/application",
    tag = "opportunities",
    params(("id" = Uuid, Path, description = "Opportunity id")),
    responses((status = 200, description = "The caller's application, if any", body = ApplicationState))
)]
pub async fn application_state(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<ApplicationState>> {
    let application = state.services.application_state(&actor, id).await?;
    Ok(ApiResponse::ok("Application status", application))
}

#[utoipa::path(
    delete,
    path = "/api/v1/opportunities/{id}/application",
    tag = "opportunities",
    params(("id" = Uuid, Path, description = "Opportunity id")),
    responses((status = 200, description = "Application withdrawn", body = Opportunity))
)]
pub async fn withdraw_application(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Opportunity>> {
    let opportunity = state.services.withdraw_application(&actor, id).await?;
    Ok(ApiResponse::ok("Application withdrawn", opportunity))
}

#[utoipa::path(
    post,
    path = "/api/v1/opportunities/{id}/offer",
    tag = "opportunities",
    params(("id" = Uuid, Path, description = "Opportunity id")),
    request_body = OfferResponseRequest,
    responses(
        (status = 200, description = "Offer accepted or declined", body = Opportunity),
        (status = 400, description = "No open offer")
    )
)]
pub async fn respond_to_offer(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<OfferResponseRequest>,
) -> ApiResult<ApiResponse<Opportunity>> {
    let opportunity = state
        .services
        .respond_to_offer(&actor, id, request.accept)
        .await?;
    let message = if request.accept { "Offer accepted" } else { "Offer declined" };
    Ok(ApiResponse::ok(message, opportunity))
}

#[utoipa::path(
    get,
    path = "/api/v1/opportunities/{id}/applicants",
    tag = "opportunities",
    params(("id" = Uuid, Path, description = "Opportunity id")),
    responses(
        (status = 200, description = "Applicants with their profiles", body = [ApplicantView]),
        (status = 403, description = "Not the poster")
    )
)]
pub async fn list_applicants(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<ApplicantView>>> {
    let applicants = state.services.list_applicants(&actor, id).await?;
    Ok(ApiResponse::ok("Applicants", applicants))
}

#[utoipa::path(
    put,
    path = "/api/v1/opportunities/{id}/applicants/{user_id}",
    tag = "opportunities",
    params(
        ("id" = Uuid, Path, description = "Opportunity id"),
        ("user_id" = Uuid, Path, description = "Applicant id")
    ),
    request_body = ApplicantStatusRequest,
    responses(
        (status = 200, description = "Applicant status updated", body = Opportunity),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Not the poster")
    )
)]
pub async fn update_applicant_status(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(request): ApiJson<ApplicantStatusRequest>,
) -> ApiResult<ApiResponse<Opportunity>> {
    let opportunity = state
        .services
        .update_applicant_status(&actor, id, user_id, request.status)
        .await?;
    Ok(ApiResponse::ok("Applicant status updated", opportunity))
}

#[utoipa::path(
    post,
    path = "/api/v1/opportunities/{id}/save",
    tag = "opportunities",
    params(("id" = Uuid, Path, description = "Opportunity id")),
    request_body(content = SaveRequest, description = "Omit the body to toggle"),
    responses((status = 200, description = "Save state after the call", body = SaveResponse))
)]
pub async fn save_opportunity(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    request: Option<ApiJson<SaveRequest>>,
) -> ApiResult<ApiResponse<SaveResponse>> {
    listing::save(
        &state,
        state.services.opportunities.as_ref(),
        &actor,
        id,
        request.map(|ApiJson(r)| r),
    )
    .await
}

#[utoipa::path(
    get,
    path = "/api/v1/opportunities/{id}/match",
    tag = "opportunities",
    params(("id" = Uuid, Path, description = "Opportunity id")),
    responses((status = 200, description = "How the caller's skills cover the posting", body = SkillMatch))
)]
pub async fn match_opportunity(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<SkillMatch>> {
    let skill_match = state.services.match_opportunity(&actor, id).await?;
    Ok(ApiResponse::ok("Skill match", skill_match))
}
