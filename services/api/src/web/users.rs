//! services/api/src/web/users.rs
//!
//! Profiles, the user directory and file uploads.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Extension,
};
use campus_core::domain::{PageRequest, ProfilePatch, Role, User, UserFilter, UserStats};
use campus_core::Actor;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::extract::{ApiJson, ApiPath, ApiQuery};
use crate::web::response::ApiResponse;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Case-insensitive match on name and email.
    pub search: Option<String>,
    pub college: Option<String>,
    pub skill: Option<String>,
    pub role: Option<Role>,
    /// Honored for staff only.
    pub include_inactive: Option<bool>,
}

impl UserQuery {
    fn into_parts(self) -> (UserFilter, PageRequest) {
        let filter = UserFilter {
            search: self.search,
            college: self.college,
            skill: self.skill,
            role: self.role,
            include_inactive: self.include_inactive.unwrap_or(false),
        };
        (filter, PageRequest::new(self.page, self.limit))
    }
}

/// A file pulled out of a multipart body.
struct Upload {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

/// Reads the part named `file` from the request.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Upload> {
    let mut multipart = multipart?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart data: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file bytes: {}", e)))?;
        return Ok(Upload {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }
    Err(ApiError::BadRequest(
        "Multipart form must include a file field".to_string(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(UserQuery),
    responses((status = 200, description = "Paged user directory", body = [User]))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<ApiResponse<Vec<User>>> {
    let (filter, page) = query.into_parts();
    let users = state.services.list_users(&actor, filter, page).await?;
    Ok(ApiResponse::page("Users", users))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Public profile", body = User),
        (status = 404, description = "Not found or deactivated")
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<User>> {
    let user = state.services.get_profile(&actor, id).await?;
    Ok(ApiResponse::ok("User", user))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = ProfilePatch,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 403, description = "Only the owner or an admin may edit a profile")
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> ApiResult<ApiResponse<User>> {
    let user = state.services.update_profile(&actor, id, patch).await?;
    Ok(ApiResponse::ok("Profile updated", user))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Account deactivated", body = User))
)]
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<User>> {
    let user = state.services.deactivate_user(&actor, id).await?;
    Ok(ApiResponse::ok("Account deactivated", user))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/stats",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "Engagement counters", body = UserStats))
)]
pub async fn user_stats(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<UserStats>> {
    let user = state.services.get_profile(&actor, id).await?;
    Ok(ApiResponse::ok("User stats", user.stats))
}

#[utoipa::path(
    post,
    path = "/api/v1/profile/resume",
    tag = "users",
    request_body(content_type = "multipart/form-data", description = "A `file` part holding the resume."),
    responses(
        (status = 200, description = "Resume stored and skills extracted when possible", body = User),
        (status = 422, description = "Empty, oversized or unsupported file")
    )
)]
pub async fn upload_resume(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ApiResponse<User>> {
    let upload = read_upload(multipart).await?;
    let user = state
        .services
        .upload_resume(&actor, &upload.file_name, &upload.content_type, upload.data)
        .await?;
    Ok(ApiResponse::ok("Resume uploaded", user))
}

#[utoipa::path(
    post,
    path = "/api/v1/profile/avatar",
    tag = "users",
    request_body(content_type = "multipart/form-data", description = "A `file` part holding the image."),
    responses(
        (status = 200, description = "Avatar stored", body = User),
        (status = 422, description = "Empty, oversized or unsupported file")
    )
)]
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ApiResponse<User>> {
    let upload = read_upload(multipart).await?;
    let user = state
        .services
        .upload_avatar(&actor, &upload.file_name, &upload.content_type, upload.data)
        .await?;
    Ok(ApiResponse::ok("Avatar uploaded", user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_users_are_excluded_unless_asked_for() {
        let (filter, page) = UserQuery {
            skill: Some("rust".to_string()),
            ..Default::default()
        }
        .into_parts();
        assert!(!filter.include_inactive);
        assert_eq!(filter.skill.as_deref(), Some("rust"));
        assert_eq!(page.page, 1);

        let (filter, _) = UserQuery {
            include_inactive: Some(true),
            ..Default::default()
        }
        .into_parts();
        assert!(filter.include_inactive);
    }
}
