//! services/api/src/web/events.rs
//!
//! Events, registrations and attendance.

use axum::{extract::State, Extension};
use campus_core::domain::{Event, EventDraft, EventPatch};
use campus_core::services::{AttendeeView, Populated};
use campus_core::Actor;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::listing::{self, ListQuery, MineQuery, SaveRequest, SaveResponse, TrendingQuery};
use crate::web::response::ApiResponse;
use crate::web::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterestedResponse {
    pub interested: bool,
    pub interested_count: usize,
}

#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "events",
    params(ListQuery),
    responses((status = 200, description = "Paged events", body = [Event]))
)]
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ApiResponse<Vec<Populated<Event>>>> {
    let (filter, page) = query.into_parts();
    listing::list(&state, state.services.events.as_ref(), filter, page, "Events").await
}

#[utoipa::path(
    get,
    path = "/api/v1/events/mine",
    tag = "events",
    params(MineQuery),
    responses((status = 200, description = "Events organized, registered for or saved by the caller", body = [Event]))
)]
pub async fn my_events(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<MineQuery>,
) -> ApiResult<ApiResponse<Vec<Populated<Event>>>> {
    let (filter, page) = query.into_parts(&actor);
    listing::list(&state, state.services.events.as_ref(), filter, page, "Your events").await
}

#[utoipa::path(
    get,
    path = "/api/v1/events/trending",
    tag = "events",
    params(TrendingQuery),
    responses((status = 200, description = "Most engaged events of the last 30 days", body = [Event]))
)]
pub async fn trending_events(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TrendingQuery>,
) -> ApiResult<ApiResponse<Vec<Populated<Event>>>> {
    listing::trending(&state, state.services.events.as_ref(), query).await
}

#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "events",
    request_body = EventDraft,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiJson(draft): ApiJson<EventDraft>,
) -> ApiResult<ApiResponse<Event>> {
    let event = state.services.create_event(&actor, draft).await?;
    Ok(ApiResponse::created("Event created", event))
}

#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event with its organizer", body = Event),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Populated<Event>>> {
    let event = state
        .services
        .view_document(state.services.events.as_ref(), id)
        .await?;
    Ok(ApiResponse::ok("Event", event))
}

#[utoipa::path(
    put,
    path = "/api/v1/events/{id}",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = EventPatch,
    responses(
        (status = 200, description = "Event updated", body = Event),
        (status = 403, description = "Not the organizer")
    )
)]
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<EventPatch>,
) -> ApiResult<ApiResponse<Event>> {
    let event = state.services.update_event(&actor, id, patch).await?;
    Ok(ApiResponse::ok("Event updated", event))
}

#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event id")),
    responses((status = 200, description = "Event cancelled", body = Event))
)]
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Event>> {
    let event = state.services.delete_event(&actor, id).await?;
    Ok(ApiResponse::ok("Event cancelled", event))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/register",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 201, description = "Registered", body = Event),
        (status = 400, description = "Registration closed or event full"),
        (status = 409, description = "Already registered")
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Event>> {
    let event = state.services.register_for_event(&actor, id).await?;
    Ok(ApiResponse::created("Registered for event", event))
}

#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}/register",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event id")),
    responses((status = 200, description = "Registration cancelled", body = Event))
)]
pub async fn cancel_registration(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Event>> {
    let event = state.services.cancel_registration(&actor, id).await?;
    Ok(ApiResponse::ok("Registration cancelled", event))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/attendance/{user_id}",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("user_id" = Uuid, Path, description = "Attendee")
    ),
    responses(
        (status = 200, description = "Attendance recorded", body = Event),
        (status = 403, description = "Not the organizer")
    )
)]
pub async fn mark_attendance(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Event>> {
    let event = state.services.mark_attendance(&actor, id, user_id).await?;
    Ok(ApiResponse::ok("Attendance recorded", event))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/no-show/{user_id}",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "Event id"),
        ("user_id" = Uuid, Path, description = "Attendee")
    ),
    responses((status = 200, description = "Marked as no-show", body = Event))
)]
pub async fn mark_no_show(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<Event>> {
    let event = state.services.mark_no_show(&actor, id, user_id).await?;
    Ok(ApiResponse::ok("Marked as no-show", event))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/interested",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event id")),
    responses((status = 200, description = "Interest state after the toggle", body = InterestedResponse))
)]
pub async fn toggle_interested(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<InterestedResponse>> {
    let (event, interested) = state.services.toggle_event_interest(&actor, id).await?;
    Ok(ApiResponse::ok(
        "Interest updated",
        InterestedResponse {
            interested,
            interested_count: event.interested.len(),
        },
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/attendees",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Attendees with their profiles", body = [AttendeeView]),
        (status = 403, description = "Not the organizer")
    )
)]
pub async fn list_attendees(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Vec<AttendeeView>>> {
    let attendees = state.services.list_attendees(&actor, id).await?;
    Ok(ApiResponse::ok("Attendees", attendees))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/save",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body(content = SaveRequest, description = "Omit the body to toggle"),
    responses((status = 200, description = "Save state after the call", body = SaveResponse))
)]
pub async fn save_event(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    request: Option<ApiJson<SaveRequest>>,
) -> ApiResult<ApiResponse<SaveResponse>> {
    listing::save(
        &state,
        state.services.events.as_ref(),
        &actor,
        id,
        request.map(|ApiJson(r)| r),
    )
    .await
}
