//! Profiles, uploads and the admin surface over users.

use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{require_text, Services};
use crate::domain::{
    normalize_skills, ListFilter, OpportunityStatus, Page, PageRequest, ProfilePatch, Role, User,
    UserFilter,
};
use crate::policy::{require_admin, require_self_or_admin, Actor};
use crate::ports::{PortError, PortResult};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const RESUME_TYPES: &[&str] = &[
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];
const IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformOverview {
    pub users: u64,
    pub active_users: u64,
    pub opportunities: u64,
    pub active_opportunities: u64,
    pub collaborations: u64,
    pub events: u64,
    pub messages: u64,
}

fn validate_upload(content_type: &str, data: &[u8], allowed: &[&str]) -> PortResult<()> {
    if data.is_empty() {
        return Err(PortError::Validation("the uploaded file is empty".to_string()));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(PortError::Validation(format!(
            "files larger than {} bytes are not accepted",
            MAX_UPLOAD_BYTES
        )));
    }
    if !allowed.contains(&content_type) {
        return Err(PortError::Validation(format!(
            "unsupported file type {}",
            content_type
        )));
    }
    Ok(())
}

/// Keeps blob keys to a safe character set.
fn blob_key(prefix: &str, user_id: Uuid, file_name: &str) -> String {
    let clean: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("{}/{}/{}-{}", prefix, user_id, Uuid::new_v4(), clean)
}

impl Services {
    /// Public profile. Deactivated accounts are only visible to themselves and
    /// platform staff.
    pub async fn get_profile(&self, actor: &Actor, user_id: Uuid) -> PortResult<User> {
        let user = self.db.get_user(user_id).await?;
        if !user.is_active && actor.id != user_id && !actor.is_staff() {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(user)
    }

    pub async fn update_profile(
        &self,
        actor: &Actor,
        user_id: Uuid,
        mut patch: ProfilePatch,
    ) -> PortResult<User> {
        require_self_or_admin(actor, user_id)?;
        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }
        if let Some(year) = patch.year {
            if !(1..=6).contains(&year) {
                return Err(PortError::Validation("year must be between 1 and 6".to_string()));
            }
        }
        patch.skills = patch.skills.map(normalize_skills);
        self.db.update_profile(user_id, &patch).await
    }

    pub async fn list_users(&self, actor: &Actor, mut filter: UserFilter, page: PageRequest) -> PortResult<Page<User>> {
        if !actor.is_staff() {
            filter.include_inactive = false;
        }
        self.db.list_users(&filter, page).await
    }

    /// Soft deactivation; sessions are revoked, records are kept.
    pub async fn deactivate_user(&self, actor: &Actor, user_id: Uuid) -> PortResult<User> {
        require_self_or_admin(actor, user_id)?;
        let user = self.db.set_active(user_id, false).await?;
        self.db.delete_sessions_for_user(user_id).await?;
        info!(%user_id, by = %actor.id, "user deactivated");
        Ok(user)
    }

    pub async fn set_user_active(&self, actor: &Actor, user_id: Uuid, is_active: bool) -> PortResult<User> {
        require_admin(actor)?;
        let user = self.db.set_active(user_id, is_active).await?;
        if !is_active {
            self.db.delete_sessions_for_user(user_id).await?;
        }
        Ok(user)
    }

    pub async fn set_user_role(&self, actor: &Actor, user_id: Uuid, role: Role) -> PortResult<User> {
        require_admin(actor)?;
        if actor.id == user_id && role != Role::Admin {
            return Err(PortError::BadRequest(
                "admins cannot demote themselves".to_string(),
            ));
        }
        let user = self.db.set_role(user_id, role).await?;
        info!(%user_id, role = role.as_str(), by = %actor.id, "role changed");
        Ok(user)
    }

    /// Stores the resume and, when the file is plain text, extracts skills from
    /// it. Extraction failures never fail the upload; they only leave
    /// `resumeSkills` untouched.
    pub async fn upload_resume(
        &self,
        actor: &Actor,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> PortResult<User> {
        validate_upload(content_type, &data, RESUME_TYPES)?;

        let extracted = match std::str::from_utf8(&data) {
            Ok(text) => match self.skill_extractor.extract_skills(text).await {
                Ok(skills) => Some(normalize_skills(skills)),
                Err(PortError::Unavailable(reason)) => {
                    debug!(%reason, "skill extraction not configured");
                    None
                }
                Err(e) => {
                    warn!(user = %actor.id, error = %e, "resume skill extraction failed");
                    None
                }
            },
            Err(_) => {
                debug!(user = %actor.id, "resume is not plain text; skipping extraction");
                None
            }
        };

        let key = blob_key("resumes", actor.id, file_name);
        let url = self.storage.upload(&key, content_type, data).await?;
        let user = self
            .db
            .set_resume(actor.id, &url, extracted.as_deref())
            .await?;
        info!(user = %actor.id, skills = user.resume_skills.len(), "resume stored");
        Ok(user)
    }

    pub async fn upload_avatar(
        &self,
        actor: &Actor,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> PortResult<User> {
        validate_upload(content_type, &data, IMAGE_TYPES)?;
        let key = blob_key("avatars", actor.id, file_name);
        let url = self.storage.upload(&key, content_type, data).await?;
        self.db.set_avatar(actor.id, &url).await
    }

    pub async fn platform_overview(&self, actor: &Actor) -> PortResult<PlatformOverview> {
        require_admin(actor)?;
        let all = ListFilter::default();
        let active_opportunities = ListFilter {
            status: Some(OpportunityStatus::Active.as_str().to_string()),
            ..Default::default()
        };
        Ok(PlatformOverview {
            users: self
                .db
                .count_users(&UserFilter {
                    include_inactive: true,
                    ..Default::default()
                })
                .await?,
            active_users: self.db.count_users(&UserFilter::default()).await?,
            opportunities: self.opportunities.count(&all).await?,
            active_opportunities: self.opportunities.count(&active_opportunities).await?,
            collaborations: self.collaborations.count(&all).await?,
            events: self.events.count(&all).await?,
            messages: self.db.count_messages().await?,
        })
    }
}
