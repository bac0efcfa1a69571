//! crates/campus_core/src/lifecycle.rs
//!
//! State machines for the embedded lists of the three owned entity types:
//! opportunity applicants, collaboration interest/team membership and event
//! attendees.
//!
//! Every function here is pure: it validates against the document it is given
//! and mutates it in place. Persisting the result (with a version check) is the
//! job of `services`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Applicant, ApplicationStatus, Attendee, AttendeeStatus, Collaboration, Document, Event,
    InterestStatus, InterestedUser, MemberStatus, Opportunity, OpportunityStatus, PaymentStatus,
    TeamMember,
};
use crate::policy::{require_mutate, Actor};
use crate::ports::{PortError, PortResult};

pub const DEFAULT_MEMBER_ROLE: &str = "member";

//=========================================================================================
// Opportunity applicants
//=========================================================================================

/// True while the user holds a live (not rejected/declined) application.
pub fn has_applied(opportunity: &Opportunity, user: Uuid) -> bool {
    opportunity.applicant(user).is_some()
}

pub fn apply(
    opportunity: &mut Opportunity,
    user: Uuid,
    now: DateTime<Utc>,
    cover_letter: Option<String>,
    resume_url: Option<String>,
) -> PortResult<()> {
    if now > opportunity.deadline {
        return Err(PortError::BadRequest(
            "the application deadline has passed".to_string(),
        ));
    }
    if opportunity.status != OpportunityStatus::Active {
        return Err(PortError::BadRequest(
            "this opportunity is not accepting applications".to_string(),
        ));
    }
    if opportunity.posted_by == user {
        return Err(PortError::Forbidden(
            "you cannot apply to your own posting".to_string(),
        ));
    }
    if has_applied(opportunity, user) {
        return Err(PortError::Conflict(
            "you have already applied to this opportunity".to_string(),
        ));
    }

    opportunity.applicants.push(Applicant {
        user,
        applied_at: now,
        status: ApplicationStatus::Pending,
        cover_letter,
        resume_url,
    });
    Ok(())
}

/// The applicant status graph. Staying in the same status is always allowed.
pub fn is_allowed_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;
    from == to
        || matches!(
            (from, to),
            (Pending, Shortlisted | Rejected | Selected)
                | (Shortlisted, Selected | Rejected)
                | (Selected, Accepted | Declined)
        )
}

/// Owner-or-admin status change. Owners are held to the transition graph;
/// admins may move an application to any status.
///
/// Returns the previous status.
pub fn update_applicant_status(
    opportunity: &mut Opportunity,
    actor: &Actor,
    user: Uuid,
    status: ApplicationStatus,
) -> PortResult<ApplicationStatus> {
    require_mutate(actor, opportunity.posted_by)?;

    let applicant = opportunity
        .applicants
        .iter_mut()
        .rev()
        .find(|a| a.user == user)
        .ok_or_else(|| PortError::NotFound(format!("no application from user {}", user)))?;

    let previous = applicant.status;
    if !actor.is_admin() && !is_allowed_transition(previous, status) {
        return Err(PortError::BadRequest(format!(
            "cannot move an application from {} to {}",
            previous.as_str(),
            status.as_str()
        )));
    }
    applicant.status = status;
    Ok(previous)
}

/// The applicant's own answer to a `selected` offer.
pub fn respond_to_offer(
    opportunity: &mut Opportunity,
    user: Uuid,
    accept: bool,
) -> PortResult<ApplicationStatus> {
    let applicant = opportunity
        .applicants
        .iter_mut()
        .find(|a| a.user == user && a.status.is_live())
        .ok_or_else(|| PortError::NotFound("you have no active application here".to_string()))?;

    if applicant.status != ApplicationStatus::Selected {
        return Err(PortError::BadRequest(
            "only a selected application can be accepted or declined".to_string(),
        ));
    }
    applicant.status = if accept {
        ApplicationStatus::Accepted
    } else {
        ApplicationStatus::Declined
    };
    Ok(applicant.status)
}

/// Withdraws a pending or shortlisted application. The record is kept as
/// `declined` so the user may apply again later.
pub fn withdraw_application(opportunity: &mut Opportunity, user: Uuid) -> PortResult<()> {
    let applicant = opportunity
        .applicants
        .iter_mut()
        .find(|a| a.user == user && a.status.is_live())
        .ok_or_else(|| PortError::NotFound("you have no active application here".to_string()))?;

    match applicant.status {
        ApplicationStatus::Pending | ApplicationStatus::Shortlisted => {
            applicant.status = ApplicationStatus::Declined;
            Ok(())
        }
        other => Err(PortError::BadRequest(format!(
            "an application that is {} cannot be withdrawn",
            other.as_str()
        ))),
    }
}

//=========================================================================================
// Collaboration interest and team membership
//=========================================================================================

pub fn express_interest(
    collaboration: &mut Collaboration,
    user: Uuid,
    message: Option<String>,
    now: DateTime<Utc>,
) -> PortResult<()> {
    if !collaboration.is_listed() {
        return Err(PortError::BadRequest(
            "this collaboration is not accepting members".to_string(),
        ));
    }
    if collaboration.is_member(user) {
        return Err(PortError::Conflict(
            "you are already a member of this team".to_string(),
        ));
    }
    let open_record = collaboration.interested_users.iter().any(|i| {
        i.user == user && matches!(i.status, InterestStatus::Pending | InterestStatus::Accepted)
    });
    if open_record {
        return Err(PortError::Conflict(
            "you have already expressed interest".to_string(),
        ));
    }
    if collaboration.team_size.is_full() {
        return Err(PortError::Conflict("the team is already full".to_string()));
    }

    collaboration.interested_users.push(InterestedUser {
        user,
        message,
        applied_at: now,
        status: InterestStatus::Pending,
    });
    Ok(())
}

/// Moves a pending user into the team. Accepting someone who is already a
/// member changes nothing and returns `false`.
pub fn accept_interest(
    collaboration: &mut Collaboration,
    actor: &Actor,
    user: Uuid,
    role: Option<String>,
    now: DateTime<Utc>,
) -> PortResult<bool> {
    require_mutate(actor, collaboration.created_by)?;

    if collaboration.is_member(user) {
        return Ok(false);
    }
    if collaboration.team_size.is_full() {
        return Err(PortError::Conflict("the team is already full".to_string()));
    }
    let interest = collaboration
        .interested_users
        .iter_mut()
        .find(|i| i.user == user && i.status == InterestStatus::Pending)
        .ok_or_else(|| PortError::NotFound(format!("no pending interest from user {}", user)))?;
    interest.status = InterestStatus::Accepted;

    let role = role
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_MEMBER_ROLE.to_string());
    collaboration.team_members.push(TeamMember {
        user,
        role,
        joined_at: now,
        status: MemberStatus::Active,
    });
    collaboration.sync_team_size();
    Ok(true)
}

pub fn reject_interest(
    collaboration: &mut Collaboration,
    actor: &Actor,
    user: Uuid,
) -> PortResult<()> {
    require_mutate(actor, collaboration.created_by)?;

    let interest = collaboration
        .interested_users
        .iter_mut()
        .find(|i| i.user == user && i.status == InterestStatus::Pending)
        .ok_or_else(|| PortError::NotFound(format!("no pending interest from user {}", user)))?;
    interest.status = InterestStatus::Rejected;
    Ok(())
}

/// Owner-or-admin removal. The creator can only be removed by an admin.
pub fn remove_member(
    collaboration: &mut Collaboration,
    actor: &Actor,
    user: Uuid,
) -> PortResult<()> {
    require_mutate(actor, collaboration.created_by)?;

    if user == collaboration.created_by && !actor.is_admin() {
        return Err(PortError::Forbidden(
            "the creator can only be removed by an admin".to_string(),
        ));
    }
    drop_member(collaboration, user)
}

/// Self-service exit. The creator has to delete the collaboration instead.
pub fn leave(collaboration: &mut Collaboration, user: Uuid) -> PortResult<()> {
    if user == collaboration.created_by {
        return Err(PortError::BadRequest(
            "the creator cannot leave; delete the collaboration instead".to_string(),
        ));
    }
    drop_member(collaboration, user)
}

fn drop_member(collaboration: &mut Collaboration, user: Uuid) -> PortResult<()> {
    let before = collaboration.team_members.len();
    collaboration.team_members.retain(|m| m.user != user);
    if collaboration.team_members.len() == before {
        return Err(PortError::NotFound(format!(
            "user {} is not a member of this team",
            user
        )));
    }
    collaboration.sync_team_size();
    Ok(())
}

//=========================================================================================
// Event attendees
//=========================================================================================

pub fn register(event: &mut Event, user: Uuid, now: DateTime<Utc>) -> PortResult<()> {
    let existing = event.attendees.iter().position(|a| a.user == user);
    if let Some(index) = existing {
        if event.attendees[index].status != AttendeeStatus::Cancelled {
            return Err(PortError::Conflict(
                "you are already registered for this event".to_string(),
            ));
        }
    }
    if !event.is_registration_open(now) {
        return Err(PortError::BadRequest(
            "registration for this event is closed".to_string(),
        ));
    }

    let payment_status = match event.fee {
        Some(fee) if fee > 0 => PaymentStatus::Pending,
        _ => PaymentStatus::NotRequired,
    };
    let record = Attendee {
        user,
        registered_at: now,
        status: AttendeeStatus::Registered,
        payment_status,
    };
    // A cancelled record is reused so each user keeps exactly one.
    match existing {
        Some(index) => event.attendees[index] = record,
        None => event.attendees.push(record),
    }
    Ok(())
}

/// Cancellation keeps the record for the audit trail.
pub fn cancel_registration(event: &mut Event, user: Uuid) -> PortResult<()> {
    let attendee = event
        .attendees
        .iter_mut()
        .find(|a| a.user == user)
        .ok_or_else(|| PortError::NotFound("you are not registered for this event".to_string()))?;

    if attendee.status != AttendeeStatus::Registered {
        return Err(PortError::BadRequest(
            "only an active registration can be cancelled".to_string(),
        ));
    }
    attendee.status = AttendeeStatus::Cancelled;
    Ok(())
}

/// Organizer-or-admin. Never creates a record; returns whether the user was
/// not already marked as attended.
pub fn mark_attendance(event: &mut Event, actor: &Actor, user: Uuid) -> PortResult<bool> {
    set_attendee_status(event, actor, user, AttendeeStatus::Attended)
        .map(|previous| previous != AttendeeStatus::Attended)
}

pub fn mark_no_show(event: &mut Event, actor: &Actor, user: Uuid) -> PortResult<()> {
    set_attendee_status(event, actor, user, AttendeeStatus::NoShow).map(|_| ())
}

fn set_attendee_status(
    event: &mut Event,
    actor: &Actor,
    user: Uuid,
    status: AttendeeStatus,
) -> PortResult<AttendeeStatus> {
    require_mutate(actor, event.organizer)?;

    let attendee = event
        .attendees
        .iter_mut()
        .find(|a| a.user == user)
        .ok_or_else(|| PortError::NotFound(format!("user {} is not registered", user)))?;
    let previous = attendee.status;
    attendee.status = status;
    Ok(previous)
}

/// Flips the user's membership in the event's interested set and returns the
/// new membership.
pub fn toggle_interested(event: &mut Event, user: Uuid) -> bool {
    if event.interested.remove(&user) {
        false
    } else {
        event.interested.insert(user);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CollaborationDraft, EventDraft, OpportunityDraft, OpportunityKind, Role,
    };
    use chrono::Duration;

    fn opportunity(owner: Uuid, deadline: DateTime<Utc>) -> Opportunity {
        Opportunity::new(
            OpportunityDraft {
                title: "Backend intern".into(),
                company: "Acme".into(),
                description: "Rust services".into(),
                kind: OpportunityKind::Internship,
                location: None,
                is_remote: true,
                stipend: None,
                skills_required: vec!["rust".into()],
                deadline,
            },
            owner,
            Utc::now(),
        )
    }

    fn collaboration(owner: Uuid, required: u32) -> Collaboration {
        Collaboration::new(
            CollaborationDraft {
                title: "Robotics".into(),
                description: "Line follower".into(),
                category: None,
                skills_needed: vec![],
                team_size_required: required,
            },
            owner,
            Utc::now(),
        )
    }

    fn event(organizer: Uuid, capacity: Option<u32>) -> Event {
        Event::new(
            EventDraft {
                title: "Hackathon".into(),
                description: "24h".into(),
                category: None,
                venue: Some("Main hall".into()),
                is_online: false,
                starts_at: Utc::now() + Duration::days(7),
                ends_at: None,
                registration_deadline: None,
                capacity,
                fee: None,
            },
            organizer,
            Utc::now(),
        )
    }

    fn owner_actor(id: Uuid) -> Actor {
        Actor::new(id, Role::Recruiter)
    }

    #[test]
    fn reapplication_is_blocked_until_rejected() {
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut opp = opportunity(owner, now + Duration::days(3));

        apply(&mut opp, user, now, None, None).unwrap();
        assert!(has_applied(&opp, user));
        assert!(matches!(
            apply(&mut opp, user, now, None, None),
            Err(PortError::Conflict(_))
        ));

        update_applicant_status(&mut opp, &owner_actor(owner), user, ApplicationStatus::Rejected)
            .unwrap();
        assert!(!has_applied(&opp, user));

        apply(&mut opp, user, now, Some("again".into()), None).unwrap();
        assert!(has_applied(&opp, user));
        assert_eq!(opp.applicants.len(), 2);
    }

    #[test]
    fn reapplication_is_allowed_after_decline() {
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut opp = opportunity(owner, now + Duration::days(3));
        apply(&mut opp, user, now, None, None).unwrap();
        withdraw_application(&mut opp, user).unwrap();
        assert!(!has_applied(&opp, user));
        assert!(apply(&mut opp, user, now, None, None).is_ok());
    }

    #[test]
    fn applying_after_the_deadline_is_a_bad_request() {
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut opp = opportunity(owner, now - Duration::hours(1));
        assert!(matches!(
            apply(&mut opp, user, now, None, None),
            Err(PortError::BadRequest(_))
        ));

        // Deadline wins even over a duplicate application.
        opp.deadline = now + Duration::hours(1);
        apply(&mut opp, user, now, None, None).unwrap();
        opp.deadline = now - Duration::hours(1);
        assert!(matches!(
            apply(&mut opp, user, now, None, None),
            Err(PortError::BadRequest(_))
        ));
    }

    #[test]
    fn owner_cannot_apply_to_own_posting() {
        let owner = Uuid::new_v4();
        let now = Utc::now();
        let mut opp = opportunity(owner, now + Duration::days(1));
        assert!(matches!(
            apply(&mut opp, owner, now, None, None),
            Err(PortError::Forbidden(_))
        ));
    }

    #[test]
    fn inactive_opportunity_rejects_applications() {
        let now = Utc::now();
        let mut opp = opportunity(Uuid::new_v4(), now + Duration::days(1));
        opp.status = OpportunityStatus::Inactive;
        assert!(matches!(
            apply(&mut opp, Uuid::new_v4(), now, None, None),
            Err(PortError::BadRequest(_))
        ));
    }

    #[test]
    fn transition_table() {
        use ApplicationStatus::*;
        assert!(is_allowed_transition(Pending, Shortlisted));
        assert!(is_allowed_transition(Pending, Selected));
        assert!(is_allowed_transition(Shortlisted, Rejected));
        assert!(is_allowed_transition(Selected, Accepted));
        assert!(!is_allowed_transition(Rejected, Selected));
        assert!(!is_allowed_transition(Pending, Accepted));
        assert!(!is_allowed_transition(Accepted, Pending));
    }

    #[test]
    fn owner_is_held_to_the_graph_but_admin_is_not() {
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut opp = opportunity(owner, now + Duration::days(1));
        apply(&mut opp, user, now, None, None).unwrap();

        let err = update_applicant_status(
            &mut opp,
            &owner_actor(owner),
            user,
            ApplicationStatus::Accepted,
        );
        assert!(matches!(err, Err(PortError::BadRequest(_))));

        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        let previous =
            update_applicant_status(&mut opp, &admin, user, ApplicationStatus::Accepted).unwrap();
        assert_eq!(previous, ApplicationStatus::Pending);
        assert_eq!(opp.applicants[0].status, ApplicationStatus::Accepted);
    }

    #[test]
    fn strangers_cannot_update_applicants() {
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut opp = opportunity(owner, now + Duration::days(1));
        apply(&mut opp, user, now, None, None).unwrap();
        let stranger = Actor::new(Uuid::new_v4(), Role::Student);
        assert!(matches!(
            update_applicant_status(&mut opp, &stranger, user, ApplicationStatus::Shortlisted),
            Err(PortError::Forbidden(_))
        ));
    }

    #[test]
    fn applicant_answers_an_offer() {
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut opp = opportunity(owner, now + Duration::days(1));
        apply(&mut opp, user, now, None, None).unwrap();
        assert!(respond_to_offer(&mut opp, user, true).is_err());

        update_applicant_status(&mut opp, &owner_actor(owner), user, ApplicationStatus::Selected)
            .unwrap();
        assert_eq!(
            respond_to_offer(&mut opp, user, false).unwrap(),
            ApplicationStatus::Declined
        );
        assert!(!has_applied(&opp, user));
    }

    #[test]
    fn interest_acceptance_respects_capacity() {
        let owner = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();
        let mut collab = collaboration(owner, 2);

        express_interest(&mut collab, a, Some("hi".into()), now).unwrap();
        express_interest(&mut collab, b, None, now).unwrap();
        assert!(accept_interest(&mut collab, &owner_actor(owner), a, Some("dev".into()), now).unwrap());
        assert_eq!(collab.team_size.current, 2);

        assert!(matches!(
            accept_interest(&mut collab, &owner_actor(owner), b, None, now),
            Err(PortError::Conflict(_))
        ));
        assert_eq!(collab.team_size.current, 2);
        assert!(collab.team_size.current <= collab.team_size.required);

        let late = Uuid::new_v4();
        assert!(matches!(
            express_interest(&mut collab, late, None, now),
            Err(PortError::Conflict(_))
        ));
    }

    #[test]
    fn double_accept_is_a_no_op() {
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut collab = collaboration(owner, 4);
        express_interest(&mut collab, user, None, now).unwrap();
        assert!(accept_interest(&mut collab, &owner_actor(owner), user, None, now).unwrap());
        assert!(!accept_interest(&mut collab, &owner_actor(owner), user, None, now).unwrap());
        assert_eq!(collab.team_members.len(), 2);
        assert_eq!(collab.team_size.current, 2);
        assert_eq!(collab.team_members[1].role, DEFAULT_MEMBER_ROLE);
    }

    #[test]
    fn duplicate_interest_and_members_are_rejected() {
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut collab = collaboration(owner, 4);
        express_interest(&mut collab, user, None, now).unwrap();
        assert!(matches!(
            express_interest(&mut collab, user, None, now),
            Err(PortError::Conflict(_))
        ));
        assert!(matches!(
            express_interest(&mut collab, owner, None, now),
            Err(PortError::Conflict(_))
        ));
    }

    #[test]
    fn rejected_interest_leaves_team_untouched() {
        let owner = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut collab = collaboration(owner, 4);
        express_interest(&mut collab, user, None, now).unwrap();
        reject_interest(&mut collab, &owner_actor(owner), user).unwrap();
        assert_eq!(collab.interested_users[0].status, InterestStatus::Rejected);
        assert_eq!(collab.team_size.current, 1);
        // A rejected user may try again.
        assert!(express_interest(&mut collab, user, None, now).is_ok());
    }

    #[test]
    fn creator_cannot_leave_but_admin_can_remove_them() {
        let owner = Uuid::new_v4();
        let mut collab = collaboration(owner, 3);
        assert!(matches!(leave(&mut collab, owner), Err(PortError::BadRequest(_))));
        assert!(matches!(
            remove_member(&mut collab, &owner_actor(owner), owner),
            Err(PortError::Forbidden(_))
        ));

        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        remove_member(&mut collab, &admin, owner).unwrap();
        assert_eq!(collab.team_size.current, 0);
    }

    #[test]
    fn members_leave_and_are_removed() {
        let owner = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();
        let mut collab = collaboration(owner, 5);
        for user in [a, b] {
            express_interest(&mut collab, user, None, now).unwrap();
            accept_interest(&mut collab, &owner_actor(owner), user, None, now).unwrap();
        }
        assert_eq!(collab.team_size.current, 3);

        leave(&mut collab, a).unwrap();
        remove_member(&mut collab, &owner_actor(owner), b).unwrap();
        assert_eq!(collab.team_size.current, 1);
        assert!(matches!(leave(&mut collab, a), Err(PortError::NotFound(_))));
    }

    #[test]
    fn event_registration_rejects_duplicates_and_reuses_cancelled_records() {
        let organizer = Uuid::new_v4();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut ev = event(organizer, None);

        register(&mut ev, user, now).unwrap();
        assert!(matches!(register(&mut ev, user, now), Err(PortError::Conflict(_))));

        cancel_registration(&mut ev, user).unwrap();
        assert_eq!(ev.attendees[0].status, AttendeeStatus::Cancelled);

        register(&mut ev, user, now).unwrap();
        assert_eq!(ev.attendees.len(), 1);
        assert_eq!(ev.attendees[0].status, AttendeeStatus::Registered);
    }

    #[test]
    fn event_registration_honours_capacity_and_deadline() {
        let organizer = Uuid::new_v4();
        let now = Utc::now();
        let mut ev = event(organizer, Some(1));
        register(&mut ev, Uuid::new_v4(), now).unwrap();
        assert!(matches!(
            register(&mut ev, Uuid::new_v4(), now),
            Err(PortError::BadRequest(_))
        ));

        let mut ev = event(organizer, None);
        ev.registration_deadline = Some(now - Duration::minutes(5));
        assert!(matches!(
            register(&mut ev, Uuid::new_v4(), now),
            Err(PortError::BadRequest(_))
        ));
    }

    #[test]
    fn paid_events_start_with_pending_payment() {
        let now = Utc::now();
        let mut ev = event(Uuid::new_v4(), None);
        ev.fee = Some(200);
        let user = Uuid::new_v4();
        register(&mut ev, user, now).unwrap();
        assert_eq!(ev.attendees[0].payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn attendance_requires_an_existing_record() {
        let organizer = Uuid::new_v4();
        let user = Uuid::new_v4();
        let mut ev = event(organizer, None);
        assert!(matches!(
            mark_attendance(&mut ev, &owner_actor(organizer), user),
            Err(PortError::NotFound(_))
        ));
        assert!(ev.attendees.is_empty());

        register(&mut ev, user, Utc::now()).unwrap();
        assert!(mark_attendance(&mut ev, &owner_actor(organizer), user).unwrap());
        assert!(!mark_attendance(&mut ev, &owner_actor(organizer), user).unwrap());
        assert_eq!(ev.attendees[0].status, AttendeeStatus::Attended);

        let stranger = Actor::new(Uuid::new_v4(), Role::Student);
        assert!(matches!(
            mark_no_show(&mut ev, &stranger, user),
            Err(PortError::Forbidden(_))
        ));
    }

    #[test]
    fn interested_toggle_is_binary() {
        let mut ev = event(Uuid::new_v4(), None);
        let user = Uuid::new_v4();
        assert!(toggle_interested(&mut ev, user));
        assert!(!toggle_interested(&mut ev, user));
        assert!(ev.interested.is_empty());
    }
}
