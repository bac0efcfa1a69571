//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of every persistence port. Selected when no
//! `DATABASE_URL` is configured, and used by the integration tests.
//!
//! Each store keeps its data behind a single `tokio::sync::RwLock`, so every
//! port call is atomic with respect to the others, including the version check
//! in `replace`.

use async_trait::async_trait;
use campus_core::domain::{
    AuthSession, ConversationSummary, Document, ListFilter, Message, Page, PageRequest,
    PasswordResetToken, ProfilePatch, Role, User, UserCredentials, UserFilter, UserStat,
};
use campus_core::ports::{DatabaseService, DocumentStore, PortError, PortResult, RateLimitStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::window_bounds;

//=========================================================================================
// Documents
//=========================================================================================

pub struct MemoryDocuments<T> {
    docs: RwLock<HashMap<Uuid, T>>,
}

impl<T> Default for MemoryDocuments<T> {
    fn default() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> MemoryDocuments<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T: Document>(docs: &mut [T]) {
    docs.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
}

#[async_trait]
impl<T: Document> DocumentStore<T> for MemoryDocuments<T> {
    async fn find(&self, id: Uuid) -> PortResult<T> {
        self.docs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("{} {} not found", T::COLLECTION, id)))
    }

    async fn insert(&self, doc: &T) -> PortResult<()> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(&doc.id()) {
            return Err(PortError::Conflict(format!("{} {} already exists", T::COLLECTION, doc.id())));
        }
        let mut stored = doc.clone();
        stored.set_version(0);
        docs.insert(doc.id(), stored);
        Ok(())
    }

    async fn replace(&self, doc: &T, expected_version: i64) -> PortResult<T> {
        let mut docs = self.docs.write().await;
        let current = docs
            .get(&doc.id())
            .ok_or_else(|| PortError::NotFound(format!("{} {} not found", T::COLLECTION, doc.id())))?;
        if current.version() != expected_version {
            return Err(PortError::StaleVersion(doc.id()));
        }
        let mut stored = doc.clone();
        stored.set_version(expected_version + 1);
        docs.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    async fn increment_views(&self, id: Uuid) -> PortResult<T> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("{} {} not found", T::COLLECTION, id)))?;
        *doc.views_mut() += 1;
        doc.touch(Utc::now());
        let next = doc.version() + 1;
        doc.set_version(next);
        Ok(doc.clone())
    }

    async fn list(&self, filter: &ListFilter, page: PageRequest) -> PortResult<Page<T>> {
        let mut matching: Vec<T> = self
            .docs
            .read()
            .await
            .values()
            .filter(|doc| filter.matches(*doc))
            .cloned()
            .collect();
        newest_first(&mut matching);
        Ok(Page::from_vec(matching, page))
    }

    async fn listed_since(&self, since: DateTime<Utc>, cap: usize) -> PortResult<Vec<T>> {
        let mut recent: Vec<T> = self
            .docs
            .read()
            .await
            .values()
            .filter(|doc| doc.is_listed() && doc.updated_at() >= since)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        recent.truncate(cap);
        Ok(recent)
    }

    async fn count(&self, filter: &ListFilter) -> PortResult<u64> {
        let docs = self.docs.read().await;
        Ok(docs.values().filter(|doc| filter.matches(*doc)).count() as u64)
    }
}

//=========================================================================================
// Users, sessions and messages
//=========================================================================================

struct StoredUser {
    user: User,
    hashed_password: String,
}

#[derive(Default)]
pub struct MemoryDatabase {
    users: RwLock<HashMap<Uuid, StoredUser>>,
    sessions: RwLock<HashMap<String, AuthSession>>,
    reset_tokens: RwLock<HashMap<String, PasswordResetToken>>,
    messages: RwLock<Vec<Message>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update_user<F>(&self, user_id: Uuid, f: F) -> PortResult<User>
    where
        F: FnOnce(&mut User) + Send,
    {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        f(&mut stored.user);
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }
}

#[async_trait]
impl DatabaseService for MemoryDatabase {
    async fn create_user(&self, user: &User, hashed_password: &str) -> PortResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.user.email == user.email) {
            return Err(PortError::Conflict("User with this email already exists".to_string()));
        }
        users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.users
            .read()
            .await
            .get(&user_id)
            .map(|stored| stored.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_users(&self, user_ids: &[Uuid]) -> PortResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| users.get(id).map(|stored| stored.user.clone()))
            .collect())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let users = self.users.read().await;
        users
            .values()
            .find(|stored| stored.user.email == email)
            .map(|stored| UserCredentials {
                user_id: stored.user.id,
                email: stored.user.email.clone(),
                hashed_password: stored.hashed_password.clone(),
                is_active: stored.user.is_active,
            })
            .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))
    }

    async fn update_profile(&self, user_id: Uuid, patch: &ProfilePatch) -> PortResult<User> {
        self.update_user(user_id, |user| user.apply_patch(patch)).await
    }

    async fn set_resume(
        &self,
        user_id: Uuid,
        resume_url: &str,
        resume_skills: Option<&[String]>,
    ) -> PortResult<User> {
        self.update_user(user_id, |user| {
            user.resume_url = Some(resume_url.to_string());
            if let Some(skills) = resume_skills {
                user.resume_skills = skills.to_vec();
            }
        })
        .await
    }

    async fn set_avatar(&self, user_id: Uuid, avatar_url: &str) -> PortResult<User> {
        self.update_user(user_id, |user| user.avatar_url = Some(avatar_url.to_string()))
            .await
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> PortResult<User> {
        self.update_user(user_id, |user| user.role = role).await
    }

    async fn set_active(&self, user_id: Uuid, is_active: bool) -> PortResult<User> {
        self.update_user(user_id, |user| user.is_active = is_active).await
    }

    async fn set_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()> {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        stored.hashed_password = hashed_password.to_string();
        Ok(())
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> PortResult<()> {
        self.update_user(user_id, |user| user.last_login_at = Some(at))
            .await
            .map(|_| ())
    }

    async fn increment_user_stat(&self, user_id: Uuid, stat: UserStat) -> PortResult<()> {
        self.update_user(user_id, |user| user.increment_stat(stat))
            .await
            .map(|_| ())
    }

    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> PortResult<Page<User>> {
        let mut matching: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|stored| filter.matches(&stored.user))
            .map(|stored| stored.user.clone())
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(Page::from_vec(matching, page))
    }

    async fn count_users(&self, filter: &UserFilter) -> PortResult<u64> {
        let users = self.users.read().await;
        Ok(users.values().filter(|stored| filter.matches(&stored.user)).count() as u64)
    }

    // --- Auth Methods ---

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn delete_sessions_for_user(&self, user_id: Uuid) -> PortResult<()> {
        self.sessions
            .write()
            .await
            .retain(|_, session| session.user_id != user_id);
        Ok(())
    }

    async fn create_reset_token(&self, token: &PasswordResetToken) -> PortResult<()> {
        let mut tokens = self.reset_tokens.write().await;
        // One outstanding token per user.
        tokens.retain(|_, existing| existing.user_id != token.user_id);
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> PortResult<PasswordResetToken> {
        let tokens = self.reset_tokens.read().await;
        match tokens.get(token) {
            Some(found) if found.expires_at > Utc::now() => Ok(found.clone()),
            _ => Err(PortError::BadRequest(
                "Password reset token is invalid or has expired".to_string(),
            )),
        }
    }

    async fn delete_reset_token(&self, token: &str) -> PortResult<()> {
        self.reset_tokens.write().await.remove(token);
        Ok(())
    }

    // --- Messaging ---

    async fn insert_message(&self, message: &Message) -> PortResult<()> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn get_message(&self, message_id: Uuid) -> PortResult<Message> {
        self.messages
            .read()
            .await
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Message {} not found", message_id)))
    }

    async fn conversation(
        &self,
        viewer: Uuid,
        other: Uuid,
        page: PageRequest,
    ) -> PortResult<Page<Message>> {
        let mut thread: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.visible_to(viewer) && m.involves(other) && m.counterpart(viewer) == other)
            .cloned()
            .collect();
        thread.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_vec(thread, page))
    }

    async fn conversations(&self, viewer: Uuid) -> PortResult<Vec<ConversationSummary>> {
        let messages = self.messages.read().await;
        let mut by_counterpart: HashMap<Uuid, ConversationSummary> = HashMap::new();
        for message in messages.iter().filter(|m| m.visible_to(viewer)) {
            let other = message.counterpart(viewer);
            let unread = u64::from(message.receiver == viewer && !message.is_read);
            by_counterpart
                .entry(other)
                .and_modify(|summary| {
                    summary.unread_count += unread;
                    if message.created_at > summary.last_message.created_at {
                        summary.last_message = message.clone();
                    }
                })
                .or_insert_with(|| ConversationSummary {
                    with_user: other,
                    last_message: message.clone(),
                    unread_count: unread,
                });
        }
        let mut summaries: Vec<ConversationSummary> = by_counterpart.into_values().collect();
        summaries.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
        Ok(summaries)
    }

    async fn mark_read(&self, message_id: Uuid, at: DateTime<Utc>) -> PortResult<Message> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| PortError::NotFound(format!("Message {} not found", message_id)))?;
        if !message.is_read {
            message.is_read = true;
            message.read_at = Some(at);
        }
        Ok(message.clone())
    }

    async fn mark_conversation_read(
        &self,
        viewer: Uuid,
        other: Uuid,
        at: DateTime<Utc>,
    ) -> PortResult<u64> {
        let mut messages = self.messages.write().await;
        let mut updated = 0;
        for message in messages
            .iter_mut()
            .filter(|m| m.receiver == viewer && m.sender == other && !m.is_read)
        {
            message.is_read = true;
            message.read_at = Some(at);
            updated += 1;
        }
        Ok(updated)
    }

    async fn hide_message(&self, message_id: Uuid, for_user: Uuid) -> PortResult<()> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| PortError::NotFound(format!("Message {} not found", message_id)))?;
        message.deleted_by.insert(for_user);
        Ok(())
    }

    async fn unread_count(&self, viewer: Uuid) -> PortResult<u64> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .filter(|m| m.receiver == viewer && !m.is_read && m.visible_to(viewer))
            .count() as u64)
    }

    async fn count_messages(&self) -> PortResult<u64> {
        Ok(self.messages.read().await.len() as u64)
    }
}

//=========================================================================================
// Rate limiting
//=========================================================================================

struct Counter {
    window_start: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    hits: u64,
}

#[derive(Default)]
pub struct MemoryRateLimits {
    counters: Mutex<HashMap<String, Counter>>,
}

impl MemoryRateLimits {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimits {
    async fn hit(&self, key: &str, window: Duration, now: DateTime<Utc>) -> PortResult<u64> {
        let (window_start, expires_at) = window_bounds(now, window)?;
        let mut counters = self.counters.lock().await;
        let counter = counters.entry(key.to_string()).or_insert(Counter {
            window_start,
            expires_at,
            hits: 0,
        });
        if counter.window_start != window_start {
            counter.window_start = window_start;
            counter.expires_at = expires_at;
            counter.hits = 0;
        }
        counter.hits += 1;
        Ok(counter.hits)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let mut counters = self.counters.lock().await;
        let before = counters.len();
        counters.retain(|_, counter| counter.expires_at > now);
        Ok((before - counters.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::domain::{Opportunity, OpportunityDraft};
    use chrono::Duration as ChronoDuration;

    fn opportunity() -> Opportunity {
        let now = Utc::now();
        let draft = OpportunityDraft {
            title: "Backend intern".to_string(),
            company: "Acme".to_string(),
            description: "Build APIs".to_string(),
            kind: Default::default(),
            location: None,
            is_remote: true,
            stipend: None,
            skills_required: vec!["Rust".to_string()],
            deadline: now + ChronoDuration::days(10),
        };
        Opportunity::new(draft, Uuid::new_v4(), now)
    }

    #[tokio::test]
    async fn replace_rejects_stale_versions() {
        let store = MemoryDocuments::<Opportunity>::new();
        let doc = opportunity();
        store.insert(&doc).await.unwrap();

        let saved = store.replace(&doc, 0).await.unwrap();
        assert_eq!(saved.version, 1);

        let err = store.replace(&doc, 0).await.unwrap_err();
        assert!(matches!(err, PortError::StaleVersion(id) if id == doc.id));
    }

    #[tokio::test]
    async fn view_increments_bump_the_version() {
        let store = MemoryDocuments::<Opportunity>::new();
        let doc = opportunity();
        store.insert(&doc).await.unwrap();

        let viewed = store.increment_views(doc.id).await.unwrap();
        assert_eq!(viewed.views, 1);
        assert!(matches!(
            store.replace(&doc, 0).await,
            Err(PortError::StaleVersion(_))
        ));
    }

    #[tokio::test]
    async fn views_keep_an_old_posting_among_trending_candidates() {
        let store = MemoryDocuments::<Opportunity>::new();
        let mut doc = opportunity();
        let long_ago = Utc::now() - ChronoDuration::days(45);
        doc.created_at = long_ago;
        doc.updated_at = long_ago;
        store.insert(&doc).await.unwrap();

        let since = Utc::now() - ChronoDuration::days(30);
        assert!(store.listed_since(since, 10).await.unwrap().is_empty());

        let viewed = store.increment_views(doc.id).await.unwrap();
        assert!(viewed.updated_at >= since);
        let candidates = store.listed_since(since, 10).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].views, 1);
    }

    #[tokio::test]
    async fn rate_limit_counters_reset_per_window() {
        let limits = MemoryRateLimits::new();
        let window = Duration::from_secs(60);
        let now = Utc::now();

        assert_eq!(limits.hit("1.2.3.4", window, now).await.unwrap(), 1);
        assert_eq!(limits.hit("1.2.3.4", window, now).await.unwrap(), 2);
        assert_eq!(limits.hit("5.6.7.8", window, now).await.unwrap(), 1);

        let later = now + ChronoDuration::seconds(61);
        assert_eq!(limits.hit("1.2.3.4", window, later).await.unwrap(), 1);
        assert_eq!(limits.purge_expired(later).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected() {
        let db = MemoryDatabase::new();
        let now = Utc::now();
        let first = User::new("Ada", "ada@campus.edu", Role::Student, now);
        let second = User::new("Ada Again", "ada@campus.edu", Role::Student, now);

        db.create_user(&first, "hash").await.unwrap();
        assert!(matches!(
            db.create_user(&second, "hash").await,
            Err(PortError::Conflict(_))
        ));
    }
}
