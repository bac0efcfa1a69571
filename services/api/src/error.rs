//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! onto the response envelope.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use campus_core::ports::PortError;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::error;

use crate::config::ConfigError;

/// Attached to every error response. The `error_details` middleware adds the
/// debug text to the body when the service runs in development.
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub body: Value,
    pub debug: String,
}

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the core services or ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Too many requests, please slow down")]
    RateLimited,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request body is too large")]
    PayloadTooLarge,

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Port(port) => match port {
                PortError::NotFound(_) => StatusCode::NOT_FOUND,
                PortError::Conflict(_) | PortError::StaleVersion(_) => StatusCode::CONFLICT,
                PortError::Forbidden(_) => StatusCode::FORBIDDEN,
                PortError::BadRequest(_) => StatusCode::BAD_REQUEST,
                PortError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                PortError::Unauthorized => StatusCode::UNAUTHORIZED,
                PortError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Migration(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The human-readable message shown to clients. Server-side failures are
    /// not described beyond their category.
    fn public_message(&self) -> String {
        match self {
            ApiError::Port(PortError::NotFound(m))
            | ApiError::Port(PortError::Conflict(m))
            | ApiError::Port(PortError::Forbidden(m))
            | ApiError::Port(PortError::BadRequest(m))
            | ApiError::Port(PortError::Validation(m))
            | ApiError::Port(PortError::Unavailable(m))
            | ApiError::Unauthorized(m)
            | ApiError::BadRequest(m) => m.clone(),
            ApiError::Port(PortError::Unauthorized) => "Authentication required".to_string(),
            ApiError::Port(PortError::StaleVersion(_)) => {
                "The resource changed while you were editing it, please retry".to_string()
            }
            ApiError::RateLimited | ApiError::MethodNotAllowed | ApiError::PayloadTooLarge => {
                self.to_string()
            }
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        }

        let body = json!({
            "success": false,
            "statusCode": status.as_u16(),
            "message": self.public_message(),
            "data": null,
            "timestamp": Utc::now(),
        });
        let details = ErrorDetails {
            body: body.clone(),
            debug: format!("{:?}", self),
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(details);
        response
    }
}

//=========================================================================================
// Extractor Rejections
//=========================================================================================

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_server_error() {
            return ApiError::Internal(rejection.body_text());
        }
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_onto_the_taxonomy() {
        let cases = [
            (PortError::NotFound("x".into()), 404),
            (PortError::Conflict("x".into()), 409),
            (PortError::Forbidden("x".into()), 403),
            (PortError::BadRequest("x".into()), 400),
            (PortError::Validation("x".into()), 422),
            (PortError::Unauthorized, 401),
            (PortError::Unavailable("x".into()), 503),
            (PortError::Unexpected("x".into()), 500),
        ];
        for (port, code) in cases {
            assert_eq!(ApiError::from(port).status().as_u16(), code);
        }
        assert_eq!(ApiError::RateLimited.status().as_u16(), 429);
        assert_eq!(ApiError::MethodNotAllowed.status().as_u16(), 405);
    }

    #[test]
    fn error_responses_carry_their_details_for_the_dev_middleware() {
        let response = ApiError::BadRequest("unknown variant `hired`".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let details = response.extensions().get::<ErrorDetails>().unwrap();
        assert_eq!(details.body["success"], false);
        assert_eq!(details.body["statusCode"], 400);
        assert!(details.debug.contains("BadRequest"));
    }

    #[test]
    fn internal_messages_are_not_leaked() {
        let err = ApiError::Port(PortError::Unexpected("connection refused at 10.0.0.3".into()));
        assert_eq!(err.public_message(), "Internal server error");
    }
}
