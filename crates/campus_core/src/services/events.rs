//! Events: registration, attendance and the interested toggle.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{mutate, require_text, Services};
use crate::domain::{Attendee, Event, EventDraft, EventPatch, EventStatus, UserStat, UserSummary};
use crate::lifecycle;
use crate::notify::Template;
use crate::policy::{require_mutate, Actor};
use crate::ports::{PortError, PortResult};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeView {
    #[serde(flatten)]
    pub attendee: Attendee,
    pub profile: Option<UserSummary>,
}

fn validate_schedule(event: &Event) -> PortResult<()> {
    if let Some(ends_at) = event.ends_at {
        if ends_at < event.starts_at {
            return Err(PortError::Validation(
                "endsAt must not be before startsAt".to_string(),
            ));
        }
    }
    if let Some(deadline) = event.registration_deadline {
        if deadline > event.starts_at {
            return Err(PortError::Validation(
                "registrationDeadline must not be after startsAt".to_string(),
            ));
        }
    }
    Ok(())
}

impl Services {
    pub async fn create_event(&self, actor: &Actor, draft: EventDraft) -> PortResult<Event> {
        require_text("title", &draft.title)?;
        let now = Utc::now();
        if draft.starts_at <= now {
            return Err(PortError::Validation(
                "startsAt must be in the future".to_string(),
            ));
        }
        let event = Event::new(draft, actor.id, now);
        validate_schedule(&event)?;
        self.events.insert(&event).await?;
        info!(id = %event.id, organizer = %actor.id, "event created");
        Ok(event)
    }

    pub async fn update_event(&self, actor: &Actor, id: Uuid, patch: EventPatch) -> PortResult<Event> {
        if let Some(title) = &patch.title {
            require_text("title", title)?;
        }
        let (event, _) = mutate(self.events.as_ref(), id, |e| {
            require_mutate(actor, e.organizer)?;
            if let Some(title) = &patch.title {
                e.title = title.trim().to_string();
            }
            if let Some(description) = &patch.description {
                e.description = description.clone();
            }
            if patch.category.is_some() {
                e.category = patch.category.clone();
            }
            if patch.venue.is_some() {
                e.venue = patch.venue.clone();
            }
            if let Some(is_online) = patch.is_online {
                e.is_online = is_online;
            }
            if let Some(starts_at) = patch.starts_at {
                e.starts_at = starts_at;
            }
            if patch.ends_at.is_some() {
                e.ends_at = patch.ends_at;
            }
            if patch.registration_deadline.is_some() {
                e.registration_deadline = patch.registration_deadline;
            }
            if let Some(capacity) = patch.capacity {
                if (capacity as usize) < e.seats_taken() {
                    return Err(PortError::Validation(format!(
                        "capacity cannot be below the {} seats already taken",
                        e.seats_taken()
                    )));
                }
                e.capacity = Some(capacity);
            }
            if patch.fee.is_some() {
                e.fee = patch.fee;
            }
            if let Some(status) = patch.status {
                e.status = status;
            }
            validate_schedule(e)
        })
        .await?;
        Ok(event)
    }

    /// Soft delete: the event is cancelled and kept.
    pub async fn delete_event(&self, actor: &Actor, id: Uuid) -> PortResult<Event> {
        let (event, _) = mutate(self.events.as_ref(), id, |e| {
            require_mutate(actor, e.organizer)?;
            e.status = EventStatus::Cancelled;
            Ok(())
        })
        .await?;
        info!(%id, by = %actor.id, "event cancelled");
        Ok(event)
    }

    pub async fn register_for_event(&self, actor: &Actor, id: Uuid) -> PortResult<Event> {
        let now = Utc::now();
        let (event, _) = mutate(self.events.as_ref(), id, |e| {
            lifecycle::register(e, actor.id, now)
        })
        .await?;

        if let Some(user) = self.user_opt(actor.id).await {
            self.notify(Template::EventRegistration {
                user: &user,
                event: &event,
            });
        }
        Ok(event)
    }

    pub async fn cancel_registration(&self, actor: &Actor, id: Uuid) -> PortResult<Event> {
        let (event, _) = mutate(self.events.as_ref(), id, |e| {
            lifecycle::cancel_registration(e, actor.id)
        })
        .await?;
        Ok(event)
    }

    pub async fn mark_attendance(&self, actor: &Actor, id: Uuid, user: Uuid) -> PortResult<Event> {
        let (event, first_time) = mutate(self.events.as_ref(), id, |e| {
            lifecycle::mark_attendance(e, actor, user)
        })
        .await?;

        if first_time {
            if let Err(e) = self
                .db
                .increment_user_stat(user, UserStat::EventsAttended)
                .await
            {
                warn!(%user, error = %e, "failed to bump attendance counter");
            }
        }
        Ok(event)
    }

    pub async fn mark_no_show(&self, actor: &Actor, id: Uuid, user: Uuid) -> PortResult<Event> {
        let (event, _) = mutate(self.events.as_ref(), id, |e| {
            lifecycle::mark_no_show(e, actor, user)
        })
        .await?;
        Ok(event)
    }

    /// Returns the event and whether the actor is now marked interested.
    pub async fn toggle_event_interest(&self, actor: &Actor, id: Uuid) -> PortResult<(Event, bool)> {
        mutate(self.events.as_ref(), id, |e| {
            Ok(lifecycle::toggle_interested(e, actor.id))
        })
        .await
    }

    pub async fn list_attendees(&self, actor: &Actor, id: Uuid) -> PortResult<Vec<AttendeeView>> {
        let event = self.events.find(id).await?;
        require_mutate(actor, event.organizer)?;

        let ids: Vec<Uuid> = event.attendees.iter().map(|a| a.user).collect();
        let profiles: HashMap<Uuid, UserSummary> = self
            .db
            .get_users(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.summary()))
            .collect();

        Ok(event
            .attendees
            .into_iter()
            .map(|attendee| AttendeeView {
                profile: profiles.get(&attendee.user).cloned(),
                attendee,
            })
            .collect())
    }
}
