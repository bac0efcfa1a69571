//! Collaboration boards: interest requests and team membership.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{mutate, require_text, Services};
use crate::domain::{
    Collaboration, CollaborationDraft, CollaborationPatch, CollaborationStatus, UserStat,
};
use crate::lifecycle;
use crate::notify::Template;
use crate::policy::{require_mutate, Actor};
use crate::ports::{PortError, PortResult};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterestRequest {
    pub message: Option<String>,
}

impl Services {
    pub async fn create_collaboration(
        &self,
        actor: &Actor,
        draft: CollaborationDraft,
    ) -> PortResult<Collaboration> {
        require_text("title", &draft.title)?;
        require_text("description", &draft.description)?;
        if draft.team_size_required < 1 {
            return Err(PortError::Validation(
                "teamSizeRequired must be at least 1".to_string(),
            ));
        }
        let collaboration = Collaboration::new(draft, actor.id, Utc::now());
        self.collaborations.insert(&collaboration).await?;
        info!(id = %collaboration.id, created_by = %actor.id, "collaboration created");
        Ok(collaboration)
    }

    pub async fn update_collaboration(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: CollaborationPatch,
    ) -> PortResult<Collaboration> {
        if let Some(title) = &patch.title {
            require_text("title", title)?;
        }
        let (collaboration, _) = mutate(self.collaborations.as_ref(), id, |c| {
            require_mutate(actor, c.created_by)?;
            if let Some(required) = patch.team_size_required {
                if required < c.team_size.current.max(1) {
                    return Err(PortError::Validation(format!(
                        "teamSizeRequired cannot be below the current team size ({})",
                        c.team_size.current
                    )));
                }
                c.team_size.required = required;
            }
            if let Some(title) = &patch.title {
                c.title = title.trim().to_string();
            }
            if let Some(description) = &patch.description {
                c.description = description.clone();
            }
            if patch.category.is_some() {
                c.category = patch.category.clone();
            }
            if let Some(skills) = &patch.skills_needed {
                c.skills_needed = crate::domain::normalize_skills(skills.clone());
            }
            if let Some(status) = patch.status {
                c.status = status;
            }
            Ok(())
        })
        .await?;
        Ok(collaboration)
    }

    /// Soft delete: the board is closed and kept.
    pub async fn delete_collaboration(&self, actor: &Actor, id: Uuid) -> PortResult<Collaboration> {
        let (collaboration, _) = mutate(self.collaborations.as_ref(), id, |c| {
            require_mutate(actor, c.created_by)?;
            c.status = CollaborationStatus::Closed;
            Ok(())
        })
        .await?;
        info!(%id, by = %actor.id, "collaboration closed");
        Ok(collaboration)
    }

    pub async fn express_interest(
        &self,
        actor: &Actor,
        id: Uuid,
        request: InterestRequest,
    ) -> PortResult<Collaboration> {
        let now = Utc::now();
        let message = request.message.filter(|m| !m.trim().is_empty());
        let (collaboration, _) = mutate(self.collaborations.as_ref(), id, |c| {
            lifecycle::express_interest(c, actor.id, message.clone(), now)
        })
        .await?;

        if let (Some(creator), Some(user)) = (
            self.user_opt(collaboration.created_by).await,
            self.user_opt(actor.id).await,
        ) {
            self.notify(Template::InterestReceived {
                creator: &creator,
                user: &user,
                title: &collaboration.title,
            });
        }
        Ok(collaboration)
    }

    pub async fn accept_interest(
        &self,
        actor: &Actor,
        id: Uuid,
        user: Uuid,
        role: Option<String>,
    ) -> PortResult<Collaboration> {
        let now = Utc::now();
        let (collaboration, joined) = mutate(self.collaborations.as_ref(), id, |c| {
            lifecycle::accept_interest(c, actor, user, role.clone(), now)
        })
        .await?;

        if joined {
            if let Err(e) = self
                .db
                .increment_user_stat(user, UserStat::CollaborationsJoined)
                .await
            {
                warn!(%user, error = %e, "failed to bump collaboration counter");
            }
            self.notify_interest_decision(user, &collaboration.title, true).await;
        }
        Ok(collaboration)
    }

    pub async fn reject_interest(&self, actor: &Actor, id: Uuid, user: Uuid) -> PortResult<Collaboration> {
        let (collaboration, _) = mutate(self.collaborations.as_ref(), id, |c| {
            lifecycle::reject_interest(c, actor, user)
        })
        .await?;
        self.notify_interest_decision(user, &collaboration.title, false).await;
        Ok(collaboration)
    }

    pub async fn remove_member(&self, actor: &Actor, id: Uuid, user: Uuid) -> PortResult<Collaboration> {
        let (collaboration, _) = mutate(self.collaborations.as_ref(), id, |c| {
            lifecycle::remove_member(c, actor, user)
        })
        .await?;
        info!(%id, %user, by = %actor.id, "team member removed");
        Ok(collaboration)
    }

    pub async fn leave_collaboration(&self, actor: &Actor, id: Uuid) -> PortResult<Collaboration> {
        let (collaboration, _) = mutate(self.collaborations.as_ref(), id, |c| {
            lifecycle::leave(c, actor.id)
        })
        .await?;
        Ok(collaboration)
    }

    async fn notify_interest_decision(&self, user: Uuid, title: &str, accepted: bool) {
        if let Some(user) = self.user_opt(user).await {
            self.notify(Template::InterestDecision {
                user: &user,
                title,
                accepted,
            });
        }
    }
}
