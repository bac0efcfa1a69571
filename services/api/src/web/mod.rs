pub mod admin;
pub mod auth;
pub mod collaborations;
pub mod events;
pub mod extract;
pub mod listing;
pub mod messages;
pub mod middleware;
pub mod opportunities;
pub mod response;
pub mod rest;
pub mod state;
pub mod users;

pub use middleware::require_auth;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use campus_core::PortError;

use crate::config::ConfigError;
use crate::error::{ApiError, ApiResult};
use rest::ApiDoc;
use state::AppState;

/// Room for a maximum-size upload plus the multipart framing around it.
const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Builds the complete application: `/health`, the `/api/v1` surface and the
/// Swagger UI.
pub fn router(state: Arc<AppState>) -> ApiResult<Router> {
    let origin = HeaderValue::from_str(&state.config.cors_origin).map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/forgot-password", post(auth::forgot_password_handler))
        .route("/auth/reset-password", post(auth::reset_password_handler))
        .route("/opportunities", get(opportunities::list_opportunities))
        .route("/opportunities/trending", get(opportunities::trending_opportunities))
        .route("/opportunities/{id}", get(opportunities::get_opportunity))
        .route("/collaborations", get(collaborations::list_collaborations))
        .route("/collaborations/trending", get(collaborations::trending_collaborations))
        .route("/collaborations/{id}", get(collaborations::get_collaboration))
        .route("/events", get(events::list_events))
        .route("/events/trending", get(events::trending_events))
        .route("/events/{id}", get(events::get_event));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/me", get(auth::me_handler))
        // Opportunities
        .route("/opportunities", post(opportunities::create_opportunity))
        .route("/opportunities/mine", get(opportunities::my_opportunities))
        .route("/opportunities/recommended", get(opportunities::recommended_opportunities))
        .route(
            "/opportunities/{id}",
            put(opportunities::update_opportunity).delete(opportunities::delete_opportunity),
        )
        .route("/opportunities/{id}/apply", post(opportunities::apply))
        .route(
            "/opportunities/{id}/application",
            get(opportunities::application_state).delete(opportunities::withdraw_application),
        )
        .route("/opportunities/{id}/offer", post(opportunities::respond_to_offer))
        .route("/opportunities/{id}/applicants", get(opportunities::list_applicants))
        .route(
            "/opportunities/{id}/applicants/{user_id}",
            put(opportunities::update_applicant_status),
        )
        .route("/opportunities/{id}/save", post(opportunities::save_opportunity))
        .route("/opportunities/{id}/match", get(opportunities::match_opportunity))
        // Collaborations
        .route("/collaborations", post(collaborations::create_collaboration))
        .route("/collaborations/mine", get(collaborations::my_collaborations))
        .route(
            "/collaborations/{id}",
            put(collaborations::update_collaboration).delete(collaborations::delete_collaboration),
        )
        .route("/collaborations/{id}/interest", post(collaborations::express_interest))
        .route(
            "/collaborations/{id}/interest/{user_id}/accept",
            post(collaborations::accept_interest),
        )
        .route(
            "/collaborations/{id}/interest/{user_id}/reject",
            post(collaborations::reject_interest),
        )
        .route(
            "/collaborations/{id}/members/{user_id}",
            delete(collaborations::remove_member),
        )
        .route("/collaborations/{id}/leave", post(collaborations::leave_collaboration))
        .route("/collaborations/{id}/save", post(collaborations::save_collaboration))
        // Events
        .route("/events", post(events::create_event))
        .route("/events/mine", get(events::my_events))
        .route("/events/{id}", put(events::update_event).delete(events::delete_event))
        .route(
            "/events/{id}/register",
            post(events::register).delete(events::cancel_registration),
        )
        .route("/events/{id}/attendance/{user_id}", post(events::mark_attendance))
        .route("/events/{id}/no-show/{user_id}", post(events::mark_no_show))
        .route("/events/{id}/interested", post(events::toggle_interested))
        .route("/events/{id}/attendees", get(events::list_attendees))
        .route("/events/{id}/save", post(events::save_event))
        // Messages
        .route("/messages", post(messages::send_message))
        .route("/messages/conversations", get(messages::conversations))
        .route("/messages/unread-count", get(messages::unread_count))
        .route("/messages/with/{user_id}", get(messages::conversation))
        .route("/messages/with/{user_id}/read", post(messages::mark_conversation_read))
        .route("/messages/{id}/read", post(messages::mark_read))
        .route("/messages/{id}", delete(messages::delete_message))
        // Users
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::deactivate_user),
        )
        .route("/users/{id}/stats", get(users::user_stats))
        .route("/profile/resume", post(users::upload_resume))
        .route("/profile/avatar", post(users::upload_avatar))
        // Admin
        .route("/admin/overview", get(admin::overview))
        .route("/admin/users/{id}/role", put(admin::set_role))
        .route("/admin/users/{id}/active", put(admin::set_active))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ));

    let app = Router::new()
        .route("/health", get(rest::health_handler))
        .nest("/api/v1", api_router)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::error_details,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    Ok(app)
}

async fn route_not_found() -> ApiError {
    ApiError::Port(PortError::NotFound("Route not found".to_string()))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
