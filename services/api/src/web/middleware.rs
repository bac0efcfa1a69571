//! services/api/src/web/middleware.rs
//!
//! Authentication, rate-limiting and error-detail middleware.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use campus_core::{Actor, PortError};
use chrono::Utc;
use serde_json::Value;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::{ApiError, ErrorDetails};
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// The opaque token the current request authenticated with.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Reads the session token from the `session` cookie, falling back to an
/// `Authorization: Bearer` header.
pub fn session_token<B>(req: &axum::http::Request<B>) -> Option<String> {
    let from_cookie = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|c| {
                c.trim()
                    .strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                    .map(str::to_string)
            })
        });

    from_cookie.or_else(|| {
        req.headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
    })
    .filter(|token| !token.is_empty())
}

/// Middleware that validates the session token and resolves the caller.
///
/// If valid, inserts the `Actor` and the `SessionToken` into request extensions
/// for handlers to use. Deactivated accounts are rejected even with a live
/// session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session_token(&req)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let user_id = state
        .services
        .db
        .validate_auth_session(&token)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized => {
                ApiError::Unauthorized("Session is invalid or has expired".to_string())
            }
            other => {
                error!("Failed to validate auth session: {:?}", other);
                ApiError::Port(other)
            }
        })?;

    let user = match state.services.db.get_user(user_id).await {
        Ok(user) => user,
        Err(PortError::NotFound(_)) => {
            return Err(ApiError::Unauthorized("Session is invalid or has expired".to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated".to_string()));
    }

    req.extensions_mut().insert(Actor::new(user.id, user.role));
    req.extensions_mut().insert(SessionToken(token));
    Ok(next.run(req).await)
}

/// Fixed-window limit per client IP. Counter failures let the request through.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = extract_client_ip(&req)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match state
        .rate_limits
        .hit(&key, state.config.rate_limit_window, Utc::now())
        .await
    {
        Ok(hits) if hits > state.config.rate_limit_max_requests => {
            warn!(ip = %key, hits, "Rate limit exceeded");
            return Err(ApiError::RateLimited);
        }
        Ok(_) => {}
        Err(e) => warn!(ip = %key, error = %e, "rate limit counter unavailable"),
    }

    Ok(next.run(req).await)
}

/// In development, copies the debug text of a failed request into the error
/// envelope as `error`. Production responses are left untouched.
pub async fn error_details(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    if !state.config.is_development() {
        return response;
    }
    let Some(details) = response.extensions().get::<ErrorDetails>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    let mut body = details.body;
    body["error"] = Value::String(details.debug);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(body.to_string()))
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn extract_client_ip<B>(req: &axum::http::Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    #[test]
    fn forwarded_headers_take_the_first_hop() {
        let req = HttpRequest::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&req), "203.0.113.7".parse().ok());
    }

    #[test]
    fn connect_info_takes_precedence() {
        let mut req = HttpRequest::builder()
            .header("x-real-ip", "198.51.100.4")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&req), "198.51.100.4".parse().ok());

        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(extract_client_ip(&req), "192.0.2.1".parse().ok());
    }

    #[test]
    fn cookie_wins_over_bearer_header() {
        let req = HttpRequest::builder()
            .header(header::COOKIE, "theme=dark; session=abc")
            .header(header::AUTHORIZATION, "Bearer xyz")
            .body(Body::empty())
            .unwrap();
        assert_eq!(session_token(&req).as_deref(), Some("abc"));

        let req = HttpRequest::builder()
            .header(header::AUTHORIZATION, "Bearer xyz")
            .body(Body::empty())
            .unwrap();
        assert_eq!(session_token(&req).as_deref(), Some("xyz"));
    }
}
