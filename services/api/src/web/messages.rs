//! services/api/src/web/messages.rs
//!
//! Direct messages between users.

use axum::{extract::State, Extension};
use campus_core::domain::{ConversationSummary, Message, PageRequest};
use campus_core::services::NewMessage;
use campus_core::Actor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::response::ApiResponse;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CountResponse {
    pub count: u64,
}

#[utoipa::path(
    post,
    path = "/api/v1/messages",
    tag = "messages",
    request_body = NewMessage,
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 404, description = "Receiver not found"),
        (status = 422, description = "Empty or oversized content")
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiJson(request): ApiJson<NewMessage>,
) -> ApiResult<ApiResponse<Message>> {
    let message = state.services.send_message(&actor, request).await?;
    Ok(ApiResponse::created("Message sent", message))
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/conversations",
    tag = "messages",
    responses((status = 200, description = "Latest message per counterpart", body = [ConversationSummary]))
)]
pub async fn conversations(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<ApiResponse<Vec<ConversationSummary>>> {
    let conversations = state.services.conversations(&actor).await?;
    Ok(ApiResponse::ok("Conversations", conversations))
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/unread-count",
    tag = "messages",
    responses((status = 200, description = "Unread messages addressed to the caller", body = CountResponse))
)]
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<ApiResponse<CountResponse>> {
    let count = state.services.unread_count(&actor).await?;
    Ok(ApiResponse::ok("Unread messages", CountResponse { count }))
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/with/{user_id}",
    tag = "messages",
    params(("user_id" = Uuid, Path, description = "Counterpart"), PageQuery),
    responses((status = 200, description = "Messages exchanged with the user, newest first", body = [Message]))
)]
pub async fn conversation(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<Vec<Message>>> {
    let page = state
        .services
        .conversation(&actor, user_id, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(ApiResponse::page("Conversation", page))
}

#[utoipa::path(
    post,
    path = "/api/v1/messages/with/{user_id}/read",
    tag = "messages",
    params(("user_id" = Uuid, Path, description = "Counterpart")),
    responses((status = 200, description = "Number of messages marked read", body = CountResponse))
)]
pub async fn mark_conversation_read(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<CountResponse>> {
    let count = state.services.mark_conversation_read(&actor, user_id).await?;
    Ok(ApiResponse::ok("Conversation marked as read", CountResponse { count }))
}

#[utoipa::path(
    post,
    path = "/api/v1/messages/{id}/read",
    tag = "messages",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message marked read", body = Message),
        (status = 403, description = "Only the receiver can mark a message read")
    )
)]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Message>> {
    let message = state.services.mark_message_read(&actor, id).await?;
    Ok(ApiResponse::ok("Message marked as read", message))
}

#[utoipa::path(
    delete,
    path = "/api/v1/messages/{id}",
    tag = "messages",
    params(("id" = Uuid, Path, description = "Message id")),
    responses((status = 200, description = "Message hidden for the caller"))
)]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    state.services.delete_message(&actor, id).await?;
    Ok(ApiResponse::ok("Message deleted", ()))
}
