//! crates/campus_core/src/services/mod.rs
//!
//! Application services: load a document, run a pure lifecycle step on it and
//! write it back with a version check, then fire the matching notification.
//!
//! Every embedded-list mutation goes through [`mutate`], so two concurrent
//! requests against the same document can never overwrite each other's change.

mod collaborations;
mod documents;
mod events;
mod messages;
mod opportunities;
mod users;

pub use collaborations::InterestRequest;
pub use documents::Populated;
pub use events::AttendeeView;
pub use messages::NewMessage;
pub use opportunities::{ApplicantView, ApplicationRequest, ApplicationState};
pub use users::PlatformOverview;

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{Collaboration, Document, Event, Opportunity, User};
use crate::notify::{self, Template};
use crate::ports::{
    BlobStorage, DatabaseService, DocumentStore, Notifier, PortError, PortResult,
    SkillExtractionService, SkillMatcher,
};

/// How many times a compare-and-swap write is retried before giving up.
pub const MAX_CAS_ATTEMPTS: usize = 5;

/// Read-mutate-write with optimistic concurrency.
///
/// `f` may run more than once; it must only touch the document it is given.
/// Errors returned by `f` abort immediately and nothing is written.
pub async fn mutate<T, R, F>(store: &dyn DocumentStore<T>, id: Uuid, mut f: F) -> PortResult<(T, R)>
where
    T: Document,
    F: FnMut(&mut T) -> PortResult<R> + Send,
    R: Send,
{
    for attempt in 1..=MAX_CAS_ATTEMPTS {
        let mut doc = store.find(id).await?;
        let expected = doc.version();
        let outcome = f(&mut doc)?;
        doc.touch(Utc::now());

        match store.replace(&doc, expected).await {
            Ok(saved) => return Ok((saved, outcome)),
            Err(PortError::StaleVersion(_)) => {
                debug!(collection = T::COLLECTION, %id, attempt, "version conflict, retrying");
            }
            Err(e) => return Err(e),
        }
    }
    warn!(collection = T::COLLECTION, %id, "gave up after repeated version conflicts");
    Err(PortError::Conflict(
        "the resource is being modified concurrently, please retry".to_string(),
    ))
}

/// Everything the services need, injected once at startup.
#[derive(Clone)]
pub struct Services {
    pub db: Arc<dyn DatabaseService>,
    pub opportunities: Arc<dyn DocumentStore<Opportunity>>,
    pub collaborations: Arc<dyn DocumentStore<Collaboration>>,
    pub events: Arc<dyn DocumentStore<Event>>,
    pub notifier: Arc<dyn Notifier>,
    pub storage: Arc<dyn BlobStorage>,
    pub skill_extractor: Arc<dyn SkillExtractionService>,
    pub skill_matcher: Arc<dyn SkillMatcher>,
}

impl Services {
    /// Looks a user up for a side effect; a missing or failing lookup only
    /// disables that side effect.
    async fn user_opt(&self, user_id: Uuid) -> Option<User> {
        match self.db.get_user(user_id).await {
            Ok(user) => Some(user),
            Err(PortError::NotFound(_)) => None,
            Err(e) => {
                warn!(%user_id, error = %e, "user lookup failed");
                None
            }
        }
    }

    fn notify(&self, template: Template<'_>) {
        notify::dispatch(&self.notifier, template.render());
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> PortResult<()> {
    if value.trim().is_empty() {
        Err(PortError::Validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}
