//! Direct messages between two users.

use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Services;
use crate::domain::{ConversationSummary, Message, Page, PageRequest};
use crate::policy::Actor;
use crate::ports::{PortError, PortResult};

pub const MAX_MESSAGE_LENGTH: usize = 5000;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub receiver: Uuid,
    pub content: String,
}

impl Services {
    pub async fn send_message(&self, actor: &Actor, request: NewMessage) -> PortResult<Message> {
        let content = request.content.trim();
        if content.is_empty() {
            return Err(PortError::Validation("content is required".to_string()));
        }
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(PortError::Validation(format!(
                "content must be at most {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }
        if request.receiver == actor.id {
            return Err(PortError::BadRequest(
                "you cannot message yourself".to_string(),
            ));
        }
        let receiver = self.db.get_user(request.receiver).await?;
        if !receiver.is_active {
            return Err(PortError::NotFound(format!("User {} not found", receiver.id)));
        }

        let message = Message {
            id: Uuid::new_v4(),
            sender: actor.id,
            receiver: receiver.id,
            content: content.to_string(),
            is_read: false,
            read_at: None,
            deleted_by: BTreeSet::new(),
            created_at: Utc::now(),
        };
        self.db.insert_message(&message).await?;
        Ok(message)
    }

    pub async fn conversation(
        &self,
        actor: &Actor,
        other: Uuid,
        page: PageRequest,
    ) -> PortResult<Page<Message>> {
        self.db.conversation(actor.id, other, page).await
    }

    pub async fn conversations(&self, actor: &Actor) -> PortResult<Vec<ConversationSummary>> {
        self.db.conversations(actor.id).await
    }

    /// Only the receiver can mark a message read.
    pub async fn mark_message_read(&self, actor: &Actor, message_id: Uuid) -> PortResult<Message> {
        let message = self.db.get_message(message_id).await?;
        if !message.visible_to(actor.id) {
            return Err(PortError::NotFound(format!("Message {} not found", message_id)));
        }
        if message.receiver != actor.id {
            return Err(PortError::Forbidden(
                "only the receiver can mark a message as read".to_string(),
            ));
        }
        if message.is_read {
            return Ok(message);
        }
        self.db.mark_read(message_id, Utc::now()).await
    }

    pub async fn mark_conversation_read(&self, actor: &Actor, other: Uuid) -> PortResult<u64> {
        self.db
            .mark_conversation_read(actor.id, other, Utc::now())
            .await
    }

    /// Hides the message for the actor only; the other party still sees it.
    pub async fn delete_message(&self, actor: &Actor, message_id: Uuid) -> PortResult<()> {
        let message = self.db.get_message(message_id).await?;
        if !message.visible_to(actor.id) {
            return Err(PortError::NotFound(format!("Message {} not found", message_id)));
        }
        self.db.hide_message(message_id, actor.id).await
    }

    pub async fn unread_count(&self, actor: &Actor) -> PortResult<u64> {
        self.db.unread_count(actor.id).await
    }
}
