//! services/api/src/adapters/db.rs
//!
//! This module contains the PostgreSQL adapters: `DbAdapter` implements the
//! `DatabaseService` and `RateLimitStore` ports, `PgDocumentStore<T>` implements
//! `DocumentStore<T>` for each owned entity type. All of them use `sqlx`.
//!
//! Owned entities are stored whole as JSONB in the `documents` table, next to a
//! few copied columns used for filtering. The `version` column is the
//! compare-and-swap guard for every write.

use async_trait::async_trait;
use campus_core::domain::{
    AuthSession, ConversationSummary, Document, ListFilter, Message, Page, PageRequest,
    PasswordResetToken, ProfilePatch, Role, User, UserCredentials, UserFilter, UserStat,
};
use campus_core::ports::{DatabaseService, DocumentStore, PortError, PortResult, RateLimitStore};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Duration;
use uuid::Uuid;

use super::window_bounds;

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn conflict_or_unexpected(e: sqlx::Error, what: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(format!("{} already exists", what))
        }
        _ => unexpected(e),
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// A document store over the same pool.
    pub fn documents<T: Document + Unpin>(&self) -> PgDocumentStore<T> {
        PgDocumentStore::new(self.pool.clone())
    }

    /// Loads the profile row under a lock, applies `f` and writes it back.
    async fn update_user<F>(&self, user_id: Uuid, f: F) -> PortResult<User>
    where
        F: FnOnce(&mut User) + Send,
    {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let Json(mut user) = sqlx::query_scalar::<_, Json<User>>(
            "SELECT profile FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;

        f(&mut user);
        user.updated_at = Utc::now();

        sqlx::query("UPDATE users SET profile = $2, role = $3, is_active = $4 WHERE id = $1")
            .bind(user_id)
            .bind(Json(&user))
            .bind(user.role.as_str())
            .bind(user.is_active)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(user)
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
    is_active: bool,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            hashed_password: self.hashed_password,
            is_active: self.is_active,
        }
    }
}

#[derive(FromRow)]
struct ResetTokenRecord {
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}
impl ResetTokenRecord {
    fn to_domain(self) -> PasswordResetToken {
        PasswordResetToken {
            token: self.token,
            user_id: self.user_id,
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: String,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    deleted_by: Vec<Uuid>,
    created_at: DateTime<Utc>,
}
impl MessageRecord {
    fn to_domain(self) -> Message {
        Message {
            id: self.id,
            sender: self.sender_id,
            receiver: self.receiver_id,
            content: self.content,
            is_read: self.is_read,
            read_at: self.read_at,
            deleted_by: self.deleted_by.into_iter().collect(),
            created_at: self.created_at,
        }
    }
}

const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, content, is_read, read_at, deleted_by, created_at";

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if !filter.include_inactive {
        qb.push(" AND is_active");
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(college) = &filter.college {
        qb.push(" AND profile->>'college' ILIKE ")
            .push_bind(like_pattern(college));
    }
    if let Some(skill) = &filter.skill {
        qb.push(
            " AND EXISTS (SELECT 1 FROM jsonb_array_elements_text(\
             COALESCE(profile->'skills', '[]'::jsonb) || COALESCE(profile->'resumeSkills', '[]'::jsonb)\
             ) AS s(skill) WHERE lower(s.skill) = lower(",
        )
        .push_bind(skill.trim().to_string())
        .push("))");
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (profile->>'name' ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, user: &User, hashed_password: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, hashed_password, role, is_active, profile, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(hashed_password)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(Json(user))
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, "User with this email"))?;
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        sqlx::query_scalar::<_, Json<User>>("SELECT profile FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(|Json(user)| user)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_users(&self, user_ids: &[Uuid]) -> PortResult<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_scalar::<_, Json<User>>("SELECT profile FROM users WHERE id = ANY($1)")
            .bind(user_ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(rows.into_iter().map(|Json(user)| user).collect())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password, is_active FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(CredentialsRecord::to_domain)
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
        let result = sqlx::query("UPDATE users SET hashed_password = $2 WHERE id = $1")
            .bind(user_id)
            .bind(hashed_password)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
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
        let mut qb = QueryBuilder::<Postgres>::new("SELECT profile FROM users WHERE TRUE");
        push_user_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = qb
            .build_query_scalar::<Json<User>>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(Page {
            items: rows.into_iter().map(|Json(user)| user).collect(),
            total: self.count_users(filter).await?,
            request: page,
        })
    }

    async fn count_users(&self, filter: &UserFilter) -> PortResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_user_filters(&mut qb, filter);
        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count as u64)
    }

    // --- Auth Methods ---

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&session.id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_sessions_for_user(&self, user_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_reset_token(&self, token: &PasswordResetToken) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO password_resets (token, user_id, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at",
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> PortResult<PasswordResetToken> {
        sqlx::query_as::<_, ResetTokenRecord>(
            "SELECT token, user_id, expires_at FROM password_resets WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(ResetTokenRecord::to_domain)
        .ok_or_else(|| {
            PortError::BadRequest("Password reset token is invalid or has expired".to_string())
        })
    }

    async fn delete_reset_token(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM password_resets WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Messaging ---

    async fn insert_message(&self, message: &Message) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, sender_id, receiver_id, content, is_read, read_at, deleted_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(message.id)
        .bind(message.sender)
        .bind(message.receiver)
        .bind(&message.content)
        .bind(message.is_read)
        .bind(message.read_at)
        .bind(message.deleted_by.iter().copied().collect::<Vec<Uuid>>())
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_message(&self, message_id: Uuid) -> PortResult<Message> {
        sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {} FROM messages WHERE id = $1",
            MESSAGE_COLUMNS
        ))
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(MessageRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("Message {} not found", message_id)))
    }

    async fn conversation(
        &self,
        viewer: Uuid,
        other: Uuid,
        page: PageRequest,
    ) -> PortResult<Page<Message>> {
        const THREAD: &str = "((sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)) \
                              AND NOT ($1 = ANY(deleted_by))";

        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {} FROM messages WHERE {} ORDER BY created_at DESC LIMIT $3 OFFSET $4",
            MESSAGE_COLUMNS, THREAD
        ))
        .bind(viewer)
        .bind(other)
        .bind(page.limit as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM messages WHERE {}",
            THREAD
        ))
        .bind(viewer)
        .bind(other)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(Page {
            items: records.into_iter().map(MessageRecord::to_domain).collect(),
            total: total as u64,
            request: page,
        })
    }

    async fn conversations(&self, viewer: Uuid) -> PortResult<Vec<ConversationSummary>> {
        let latest = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT DISTINCT ON (other) {} FROM ( \
                SELECT m.*, CASE WHEN m.sender_id = $1 THEN m.receiver_id ELSE m.sender_id END AS other \
                FROM messages m \
                WHERE (m.sender_id = $1 OR m.receiver_id = $1) AND NOT ($1 = ANY(m.deleted_by)) \
             ) t ORDER BY other, created_at DESC",
            MESSAGE_COLUMNS
        ))
        .bind(viewer)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let unread: HashMap<Uuid, i64> = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT sender_id, COUNT(*) FROM messages \
             WHERE receiver_id = $1 AND NOT is_read AND NOT ($1 = ANY(deleted_by)) \
             GROUP BY sender_id",
        )
        .bind(viewer)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .collect();

        let mut summaries: Vec<ConversationSummary> = latest
            .into_iter()
            .map(|record| {
                let message = record.to_domain();
                let with_user = message.counterpart(viewer);
                ConversationSummary {
                    with_user,
                    unread_count: unread.get(&with_user).copied().unwrap_or(0) as u64,
                    last_message: message,
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
        Ok(summaries)
    }

    async fn mark_read(&self, message_id: Uuid, at: DateTime<Utc>) -> PortResult<Message> {
        sqlx::query_as::<_, MessageRecord>(&format!(
            "UPDATE messages SET is_read = TRUE, read_at = COALESCE(read_at, $2) WHERE id = $1 RETURNING {}",
            MESSAGE_COLUMNS
        ))
        .bind(message_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(MessageRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("Message {} not found", message_id)))
    }

    async fn mark_conversation_read(
        &self,
        viewer: Uuid,
        other: Uuid,
        at: DateTime<Utc>,
    ) -> PortResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE, read_at = $3 \
             WHERE receiver_id = $1 AND sender_id = $2 AND NOT is_read",
        )
        .bind(viewer)
        .bind(other)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn hide_message(&self, message_id: Uuid, for_user: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE messages SET deleted_by = CASE WHEN $2 = ANY(deleted_by) THEN deleted_by \
             ELSE array_append(deleted_by, $2) END WHERE id = $1",
        )
        .bind(message_id)
        .bind(for_user)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Message {} not found", message_id)));
        }
        Ok(())
    }

    async fn unread_count(&self, viewer: Uuid) -> PortResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND NOT is_read AND NOT ($1 = ANY(deleted_by))",
        )
        .bind(viewer)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(count as u64)
    }

    async fn count_messages(&self) -> PortResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count as u64)
    }
}

//=========================================================================================
// `RateLimitStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RateLimitStore for DbAdapter {
    async fn hit(&self, key: &str, window: Duration, now: DateTime<Utc>) -> PortResult<u64> {
        let (window_start, expires_at) = window_bounds(now, window)?;
        let hits = sqlx::query_scalar::<_, i64>(
            "INSERT INTO rate_limits (key, window_start, expires_at, hits) VALUES ($1, $2, $3, 1) \
             ON CONFLICT (key) DO UPDATE SET \
                hits = CASE WHEN rate_limits.window_start = EXCLUDED.window_start \
                            THEN rate_limits.hits + 1 ELSE 1 END, \
                window_start = EXCLUDED.window_start, \
                expires_at = EXCLUDED.expires_at \
             RETURNING hits",
        )
        .bind(key)
        .bind(window_start)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(hits as u64)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM rate_limits WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

/// One collection of the `documents` table.
pub struct PgDocumentStore<T> {
    pool: PgPool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PgDocumentStore<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }
}

fn push_list_filters(qb: &mut QueryBuilder<'_, Postgres>, collection: &'static str, filter: &ListFilter) {
    qb.push(" WHERE collection = ").push_bind(collection);
    if filter.listed_only {
        qb.push(" AND listed");
    }
    if let Some(status) = &filter.status {
        qb.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(owner) = filter.owner {
        qb.push(" AND owner_id = ").push_bind(owner);
    }
    if let Some(participant) = filter.participant {
        qb.push(" AND ")
            .push_bind(participant)
            .push(" = ANY(participants)");
    }
    if let Some(saved_by) = filter.saved_by {
        qb.push(" AND ").push_bind(saved_by).push(" = ANY(saved_by)");
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        qb.push(" AND search_text ILIKE ").push_bind(like_pattern(search));
    }
}

fn saved_by<T: Document>(doc: &T) -> Vec<Uuid> {
    doc.saves().iter().copied().collect()
}

#[async_trait]
impl<T: Document + Unpin> DocumentStore<T> for PgDocumentStore<T> {
    async fn find(&self, id: Uuid) -> PortResult<T> {
        sqlx::query_scalar::<_, Json<T>>(
            "SELECT body FROM documents WHERE id = $1 AND collection = $2",
        )
        .bind(id)
        .bind(T::COLLECTION)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(|Json(doc)| doc)
        .ok_or_else(|| PortError::NotFound(format!("{} {} not found", T::COLLECTION, id)))
    }

    async fn insert(&self, doc: &T) -> PortResult<()> {
        let mut stored = doc.clone();
        stored.set_version(0);
        sqlx::query(
            "INSERT INTO documents \
             (id, collection, version, owner_id, status, listed, search_text, participants, saved_by, body, created_at, updated_at) \
             VALUES ($1, $2, 0, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(stored.id())
        .bind(T::COLLECTION)
        .bind(stored.owner())
        .bind(stored.status_key())
        .bind(stored.is_listed())
        .bind(stored.search_text())
        .bind(stored.participants())
        .bind(saved_by(&stored))
        .bind(Json(&stored))
        .bind(stored.created_at())
        .bind(stored.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_unexpected(e, T::COLLECTION))?;
        Ok(())
    }

    async fn replace(&self, doc: &T, expected_version: i64) -> PortResult<T> {
        let mut stored = doc.clone();
        stored.set_version(expected_version + 1);

        let result = sqlx::query(
            "UPDATE documents SET version = $3 + 1, owner_id = $4, status = $5, listed = $6, \
             search_text = $7, participants = $8, saved_by = $9, body = $10, updated_at = $11 \
             WHERE id = $1 AND collection = $2 AND version = $3",
        )
        .bind(stored.id())
        .bind(T::COLLECTION)
        .bind(expected_version)
        .bind(stored.owner())
        .bind(stored.status_key())
        .bind(stored.is_listed())
        .bind(stored.search_text())
        .bind(stored.participants())
        .bind(saved_by(&stored))
        .bind(Json(&stored))
        .bind(stored.updated_at())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 1 {
            return Ok(stored);
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM documents WHERE id = $1 AND collection = $2)",
        )
        .bind(stored.id())
        .bind(T::COLLECTION)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        if exists {
            Err(PortError::StaleVersion(stored.id()))
        } else {
            Err(PortError::NotFound(format!("{} {} not found", T::COLLECTION, stored.id())))
        }
    }

    async fn increment_views(&self, id: Uuid) -> PortResult<T> {
        sqlx::query_scalar::<_, Json<T>>(
            "UPDATE documents SET version = version + 1, updated_at = $3, \
             body = jsonb_set(jsonb_set( \
                jsonb_set(body, '{views}', to_jsonb(COALESCE((body->>'views')::bigint, 0) + 1)), \
                '{version}', to_jsonb(version + 1)), \
                '{updatedAt}', to_jsonb($3::timestamptz)) \
             WHERE id = $1 AND collection = $2 \
             RETURNING body",
        )
        .bind(id)
        .bind(T::COLLECTION)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(|Json(doc)| doc)
        .ok_or_else(|| PortError::NotFound(format!("{} {} not found", T::COLLECTION, id)))
    }

    async fn list(&self, filter: &ListFilter, page: PageRequest) -> PortResult<Page<T>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents");
        push_list_filters(&mut qb, T::COLLECTION, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = qb
            .build_query_scalar::<Json<T>>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(Page {
            items: rows.into_iter().map(|Json(doc)| doc).collect(),
            total: self.count(filter).await?,
            request: page,
        })
    }

    async fn listed_since(&self, since: DateTime<Utc>, cap: usize) -> PortResult<Vec<T>> {
        let rows = sqlx::query_scalar::<_, Json<T>>(
            "SELECT body FROM documents WHERE collection = $1 AND listed AND updated_at >= $2 \
             ORDER BY updated_at DESC LIMIT $3",
        )
        .bind(T::COLLECTION)
        .bind(since)
        .bind(cap as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn count(&self, filter: &ListFilter) -> PortResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents");
        push_list_filters(&mut qb, T::COLLECTION, filter);
        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(like_pattern(" rust "), "%rust%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }
}
