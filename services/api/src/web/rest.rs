//! services/api/src/web/rest.rs
//!
//! The health check and the master definition for the OpenAPI specification.

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{admin, auth, collaborations, events, listing, messages, opportunities, users};
use campus_core::domain::{
    Applicant, ApplicationStatus, Attendee, AttendeeStatus, Collaboration, CollaborationDraft,
    CollaborationPatch, CollaborationStatus, ConversationSummary, Event, EventDraft, EventPatch,
    EventStatus, InterestStatus, InterestedUser, MemberStatus, Message, Opportunity,
    OpportunityDraft, OpportunityKind, OpportunityPatch, OpportunityStatus, PaymentStatus,
    ProfilePatch, Role, TeamMember, TeamSize, User, UserStats, UserSummary,
};
use campus_core::matching::{Recommendation, SkillMatch};
use campus_core::services::{
    ApplicantView, ApplicationRequest, ApplicationState, AttendeeView, InterestRequest, NewMessage,
    PlatformOverview,
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        auth::forgot_password_handler,
        auth::reset_password_handler,
        opportunities::list_opportunities,
        opportunities::my_opportunities,
        opportunities::trending_opportunities,
        opportunities::recommended_opportunities,
        opportunities::create_opportunity,
        opportunities::get_opportunity,
        opportunities::update_opportunity,
        opportunities::delete_opportunity,
        opportunities::apply,
        opportunities::application_state,
        opportunities::withdraw_application,
        opportunities::respond_to_offer,
        opportunities::list_applicants,
        opportunities::update_applicant_status,
        opportunities::save_opportunity,
        opportunities::match_opportunity,
        collaborations::list_collaborations,
        collaborations::my_collaborations,
        collaborations::trending_collaborations,
        collaborations::create_collaboration,
        collaborations::get_collaboration,
        collaborations::update_collaboration,
        collaborations::delete_collaboration,
        collaborations::express_interest,
        collaborations::accept_interest,
        collaborations::reject_interest,
        collaborations::remove_member,
        collaborations::leave_collaboration,
        collaborations::save_collaboration,
        events::list_events,
        events::my_events,
        events::trending_events,
        events::create_event,
        events::get_event,
        events::update_event,
        events::delete_event,
        events::register,
        events::cancel_registration,
        events::mark_attendance,
        events::mark_no_show,
        events::toggle_interested,
        events::list_attendees,
        events::save_event,
        messages::send_message,
        messages::conversations,
        messages::unread_count,
        messages::conversation,
        messages::mark_conversation_read,
        messages::mark_read,
        messages::delete_message,
        users::list_users,
        users::get_user,
        users::update_user,
        users::deactivate_user,
        users::user_stats,
        users::upload_resume,
        users::upload_avatar,
        admin::overview,
        admin::set_role,
        admin::set_active,
    ),
    components(
        schemas(
            HealthResponse,
            auth::SignupRequest, auth::LoginRequest, auth::ForgotPasswordRequest,
            auth::ResetPasswordRequest, auth::AuthResponse,
            Role, User, UserStats, UserSummary, ProfilePatch,
            Opportunity, OpportunityDraft, OpportunityPatch, OpportunityKind, OpportunityStatus,
            Applicant, ApplicationStatus, ApplicationRequest, ApplicationState, ApplicantView,
            opportunities::ApplicantStatusRequest, opportunities::OfferResponseRequest,
            SkillMatch, Recommendation,
            Collaboration, CollaborationDraft, CollaborationPatch, CollaborationStatus,
            TeamSize, TeamMember, MemberStatus, InterestedUser, InterestStatus, InterestRequest,
            collaborations::AcceptInterestRequest,
            Event, EventDraft, EventPatch, EventStatus, Attendee, AttendeeStatus, PaymentStatus,
            AttendeeView, events::InterestedResponse,
            listing::SaveRequest, listing::SaveResponse,
            Message, NewMessage, ConversationSummary, messages::CountResponse,
            PlatformOverview, admin::RoleRequest, admin::ActiveRequest,
        )
    ),
    tags(
        (name = "health", description = "Liveness check."),
        (name = "auth", description = "Signup, login, sessions and password reset."),
        (name = "opportunities", description = "Internships, jobs and the applications to them."),
        (name = "collaborations", description = "Project postings and team formation."),
        (name = "events", description = "Campus events and registrations."),
        (name = "messages", description = "Direct messages between users."),
        (name = "users", description = "Profiles, the user directory and uploads."),
        (name = "admin", description = "Account management for administrators.")
    )
)]
pub struct ApiDoc;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Liveness check; never touches the database.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}
