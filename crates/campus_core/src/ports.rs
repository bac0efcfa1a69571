//! crates/campus_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on. These traits form
//! the boundary of the hexagonal architecture: persistence, email, blob storage
//! and the generative-AI helpers are all injected behind them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    AuthSession, ConversationSummary, Document, ListFilter, Message, Page, PageRequest,
    PasswordResetToken, ProfilePatch, Role, User, UserCredentials, UserFilter, UserStat,
};
use crate::matching::SkillMatch;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and core operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The stored document changed since it was read. Retried by the services.
    #[error("Stale version for {0}")]
    StaleVersion(Uuid),
    /// An optional collaborator is not configured.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence Ports
//=========================================================================================

/// Storage for one collection of versioned documents.
#[async_trait]
pub trait DocumentStore<T: Document>: Send + Sync {
    async fn find(&self, id: Uuid) -> PortResult<T>;

    /// Inserts a new document at version 0.
    async fn insert(&self, doc: &T) -> PortResult<()>;

    /// Compare-and-swap write: succeeds only when the stored version equals
    /// `expected_version`, storing the document at `expected_version + 1`.
    /// Fails with `PortError::StaleVersion` otherwise.
    async fn replace(&self, doc: &T, expected_version: i64) -> PortResult<T>;

    /// Atomically adds one to the view counter and returns the updated document.
    /// A view is activity: `updated_at` moves to the time of the view, so a
    /// viewed document stays a trending candidate.
    async fn increment_views(&self, id: Uuid) -> PortResult<T>;

    /// Newest first.
    async fn list(&self, filter: &ListFilter, page: PageRequest) -> PortResult<Page<T>>;

    /// Listed documents written or viewed at or after `since`, most recent
    /// first, capped at `cap` rows.
    async fn listed_since(&self, since: DateTime<Utc>, cap: usize) -> PortResult<Vec<T>>;

    async fn count(&self, filter: &ListFilter) -> PortResult<u64>;
}

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(&self, user: &User, hashed_password: &str) -> PortResult<()>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    /// Resolves many users at once; unknown ids are skipped.
    async fn get_users(&self, user_ids: &[Uuid]) -> PortResult<Vec<User>>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn update_profile(&self, user_id: Uuid, patch: &ProfilePatch) -> PortResult<User>;

    async fn set_resume(
        &self,
        user_id: Uuid,
        resume_url: &str,
        resume_skills: Option<&[String]>,
    ) -> PortResult<User>;

    async fn set_avatar(&self, user_id: Uuid, avatar_url: &str) -> PortResult<User>;

    async fn set_role(&self, user_id: Uuid, role: Role) -> PortResult<User>;

    async fn set_active(&self, user_id: Uuid, is_active: bool) -> PortResult<User>;

    async fn set_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()>;

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> PortResult<()>;

    /// Atomically adds one to a stats counter.
    async fn increment_user_stat(&self, user_id: Uuid, stat: UserStat) -> PortResult<()>;

    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> PortResult<Page<User>>;

    async fn count_users(&self, filter: &UserFilter) -> PortResult<u64>;

    // --- Auth Methods ---
    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    async fn delete_sessions_for_user(&self, user_id: Uuid) -> PortResult<()>;

    async fn create_reset_token(&self, token: &PasswordResetToken) -> PortResult<()>;

    /// Returns the user the token belongs to if it exists and has not expired.
    async fn find_reset_token(&self, token: &str) -> PortResult<PasswordResetToken>;

    async fn delete_reset_token(&self, token: &str) -> PortResult<()>;

    // --- Messaging ---
    async fn insert_message(&self, message: &Message) -> PortResult<()>;

    async fn get_message(&self, message_id: Uuid) -> PortResult<Message>;

    /// Messages between two users still visible to `viewer`, newest first.
    async fn conversation(
        &self,
        viewer: Uuid,
        other: Uuid,
        page: PageRequest,
    ) -> PortResult<Page<Message>>;

    async fn conversations(&self, viewer: Uuid) -> PortResult<Vec<ConversationSummary>>;

    async fn mark_read(&self, message_id: Uuid, at: DateTime<Utc>) -> PortResult<Message>;

    /// Marks every unread message from `other` to `viewer` as read.
    async fn mark_conversation_read(
        &self,
        viewer: Uuid,
        other: Uuid,
        at: DateTime<Utc>,
    ) -> PortResult<u64>;

    async fn hide_message(&self, message_id: Uuid, for_user: Uuid) -> PortResult<()>;

    async fn unread_count(&self, viewer: Uuid) -> PortResult<u64>;

    async fn count_messages(&self) -> PortResult<u64>;
}

/// Fixed-window request counters with an explicit time-to-live.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Records one hit for `key` in the window containing `now` and returns the
    /// number of hits in that window so far.
    async fn hit(&self, key: &str, window: Duration, now: DateTime<Utc>) -> PortResult<u64>;

    /// Drops counters whose window ended before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> PortResult<u64>;
}

//=========================================================================================
// External Collaborator Ports
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: Email) -> PortResult<()>;
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores the bytes and returns a publicly reachable URL.
    async fn upload(&self, key: &str, content_type: &str, data: Vec<u8>) -> PortResult<String>;

    async fn delete(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait SkillExtractionService: Send + Sync {
    /// Extracts a list of skills from free text (e.g. a resume).
    async fn extract_skills(&self, text: &str) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait SkillMatcher: Send + Sync {
    /// Scores a user's skills against an opportunity's required skills.
    async fn score(&self, user_skills: &[String], opportunity_skills: &[String])
        -> PortResult<SkillMatch>;
}
