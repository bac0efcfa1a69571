//! services/api/src/adapters/mailer.rs
//!
//! Implements the `Notifier` port. `SmtpNotifier` delivers through an SMTP relay
//! with `lettre`; `LogNotifier` only writes the email to the log and is used when
//! no SMTP host is configured.

use async_trait::async_trait;
use campus_core::ports::{Email, Notifier, PortError, PortResult};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> PortResult<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| PortError::Unexpected(format!("invalid MAIL_FROM address: {}", e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, email: Email) -> PortResult<()> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| PortError::BadRequest(format!("invalid recipient {}: {}", email.to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| PortError::Unavailable(format!("SMTP delivery failed: {}", e)))?;
        Ok(())
    }
}

/// Logs instead of sending.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: Email) -> PortResult<()> {
        info!(to = %email.to, subject = %email.subject, "email delivery disabled, dropping message");
        Ok(())
    }
}
