//! services/api/src/web/response.rs
//!
//! The success envelope shared by every endpoint:
//! `{success, statusCode, message, data, pagination?, timestamp}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use campus_core::Page;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn of<T>(page: &Page<T>) -> Self {
        let total_pages = page.total_pages();
        Self {
            page: page.request.page,
            limit: page.request.limit,
            total: page.total,
            total_pages,
            has_next_page: (page.request.page as u64) < total_pages,
            has_prev_page: page.request.page > 1,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    success: bool,
    status_code: u16,
    message: String,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
    timestamp: DateTime<Utc>,
}

pub struct ApiResponse<T> {
    status: StatusCode,
    message: String,
    data: T,
    pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data,
            pagination: None,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(message, data)
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn page(message: impl Into<String>, page: Page<T>) -> Self {
        let pagination = Pagination::of(&page);
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data: page.items,
            pagination: Some(pagination),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            status_code: self.status.as_u16(),
            message: self.message,
            data: self.data,
            pagination: self.pagination,
            timestamp: Utc::now(),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::PageRequest;

    #[test]
    fn pagination_reports_neighbouring_pages() {
        let page = Page::from_vec((1..=25).collect::<Vec<u32>>(), PageRequest::new(Some(2), Some(10)));
        let pagination = Pagination::of(&page);
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next_page);
        assert!(pagination.has_prev_page);

        let last = Page::from_vec((1..=25).collect::<Vec<u32>>(), PageRequest::new(Some(3), Some(10)));
        assert!(!Pagination::of(&last).has_next_page);
    }
}
