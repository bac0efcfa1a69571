//! crates/campus_core/src/notify.rs
//!
//! Email templates keyed off lifecycle transitions, and the fire-and-forget
//! dispatcher. Dispatched mail has no delivery guarantee: failures are logged
//! and dropped, nothing is retried.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{ApplicationStatus, Event, Opportunity, User};
use crate::ports::{Email, Notifier};

pub enum Template<'a> {
    Welcome {
        user: &'a User,
    },
    ApplicationReceived {
        poster: &'a User,
        applicant: &'a User,
        opportunity: &'a Opportunity,
    },
    ApplicationStatusChanged {
        applicant: &'a User,
        opportunity: &'a Opportunity,
        status: ApplicationStatus,
    },
    InterestReceived {
        creator: &'a User,
        user: &'a User,
        title: &'a str,
    },
    InterestDecision {
        user: &'a User,
        title: &'a str,
        accepted: bool,
    },
    EventRegistration {
        user: &'a User,
        event: &'a Event,
    },
    PasswordReset {
        user: &'a User,
        link: &'a str,
    },
}

impl Template<'_> {
    pub fn render(&self) -> Email {
        match self {
            Template::Welcome { user } => Email {
                to: user.email.clone(),
                subject: "Welcome to the campus community".to_string(),
                body: format!(
                    "Hi {},\n\nYour account is ready. Complete your profile and add your skills to get matched with opportunities.",
                    user.name
                ),
            },
            Template::ApplicationReceived { poster, applicant, opportunity } => Email {
                to: poster.email.clone(),
                subject: format!("New application for {}", opportunity.title),
                body: format!(
                    "Hi {},\n\n{} applied to \"{}\" at {}.",
                    poster.name, applicant.name, opportunity.title, opportunity.company
                ),
            },
            Template::ApplicationStatusChanged { applicant, opportunity, status } => Email {
                to: applicant.email.clone(),
                subject: format!("Your application for {} was updated", opportunity.title),
                body: format!(
                    "Hi {},\n\nYour application to \"{}\" at {} is now {}.",
                    applicant.name,
                    opportunity.title,
                    opportunity.company,
                    status.as_str()
                ),
            },
            Template::InterestReceived { creator, user, title } => Email {
                to: creator.email.clone(),
                subject: format!("{} wants to join {}", user.name, title),
                body: format!(
                    "Hi {},\n\n{} expressed interest in joining \"{}\".",
                    creator.name, user.name, title
                ),
            },
            Template::InterestDecision { user, title, accepted } => Email {
                to: user.email.clone(),
                subject: format!("Update on {}", title),
                body: if *accepted {
                    format!("Hi {},\n\nYou have been added to the team for \"{}\".", user.name, title)
                } else {
                    format!("Hi {},\n\nYour request to join \"{}\" was not accepted this time.", user.name, title)
                },
            },
            Template::EventRegistration { user, event } => Email {
                to: user.email.clone(),
                subject: format!("You're registered for {}", event.title),
                body: format!(
                    "Hi {},\n\nYou are registered for \"{}\" starting {}.",
                    user.name,
                    event.title,
                    event.starts_at.format("%Y-%m-%d %H:%M UTC")
                ),
            },
            Template::PasswordReset { user, link } => Email {
                to: user.email.clone(),
                subject: "Reset your password".to_string(),
                body: format!(
                    "Hi {},\n\nUse the link below within one hour to choose a new password:\n{}\n\nIf you did not ask for this, ignore this email.",
                    user.name, link
                ),
            },
        }
    }
}

/// Sends an email in the background without waiting for the outcome.
pub fn dispatch(notifier: &Arc<dyn Notifier>, email: Email) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        let to = email.to.clone();
        match notifier.send(email).await {
            Ok(()) => debug!(to = %to, "notification sent"),
            Err(e) => warn!(to = %to, error = %e, "notification failed; dropping"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::mpsc;

    struct ChannelNotifier(mpsc::UnboundedSender<Email>);

    #[async_trait]
    impl Notifier for ChannelNotifier {
        async fn send(&self, email: Email) -> PortResult<()> {
            self.0
                .send(email)
                .map_err(|e| PortError::Unexpected(e.to_string()))
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _email: Email) -> PortResult<()> {
            Err(PortError::Unexpected("smtp down".into()))
        }
    }

    #[tokio::test]
    async fn dispatch_delivers_in_background() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier: Arc<dyn Notifier> = Arc::new(ChannelNotifier(tx));
        let user = User::new("Mira", "Mira@Example.com", Role::Student, Utc::now());

        dispatch(&notifier, Template::Welcome { user: &user }.render());

        let email = rx.recv().await.unwrap();
        assert_eq!(email.to, "mira@example.com");
        assert!(email.body.contains("Mira"));
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        let notifier: Arc<dyn Notifier> = Arc::new(FailingNotifier);
        let user = User::new("Mira", "mira@example.com", Role::Student, Utc::now());
        dispatch(&notifier, Template::Welcome { user: &user }.render());
        tokio::task::yield_now().await;
    }
}
