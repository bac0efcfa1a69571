//! Opportunity postings and their applicant lifecycle.

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{mutate, require_text, Services};
use crate::domain::{
    Applicant, ApplicationStatus, ListFilter, Opportunity, OpportunityDraft, OpportunityPatch,
    OpportunityStatus, PageRequest, UserStat, UserSummary,
};
use crate::lifecycle;
use crate::matching::{rank_recommendations, skill_match, Recommendation, SkillMatch};
use crate::notify::Template;
use crate::policy::{require_mutate, Actor};
use crate::ports::{PortError, PortResult};

/// Upper bound on postings scored for one recommendation request.
const RECOMMENDATION_CANDIDATES: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRequest {
    pub cover_letter: Option<String>,
    /// Falls back to the resume stored on the applicant's profile.
    pub resume_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationState {
    pub has_applied: bool,
    pub application: Option<Applicant>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantView {
    #[serde(flatten)]
    pub applicant: Applicant,
    pub profile: Option<UserSummary>,
}

fn validate_draft(draft: &OpportunityDraft) -> PortResult<()> {
    require_text("title", &draft.title)?;
    require_text("company", &draft.company)?;
    require_text("description", &draft.description)?;
    if draft.deadline <= Utc::now() {
        return Err(PortError::Validation(
            "deadline must be in the future".to_string(),
        ));
    }
    Ok(())
}

impl Services {
    pub async fn create_opportunity(
        &self,
        actor: &Actor,
        draft: OpportunityDraft,
    ) -> PortResult<Opportunity> {
        validate_draft(&draft)?;
        let opportunity = Opportunity::new(draft, actor.id, Utc::now());
        self.opportunities.insert(&opportunity).await?;
        info!(id = %opportunity.id, posted_by = %actor.id, "opportunity created");
        Ok(opportunity)
    }

    pub async fn update_opportunity(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: OpportunityPatch,
    ) -> PortResult<Opportunity> {
        if let Some(title) = &patch.title {
            require_text("title", title)?;
        }
        let (opportunity, _) = mutate(self.opportunities.as_ref(), id, |opp| {
            require_mutate(actor, opp.posted_by)?;
            opp.apply_patch(patch.clone());
            Ok(())
        })
        .await?;
        Ok(opportunity)
    }

    /// Soft delete: the posting is flipped to `inactive` and kept.
    pub async fn delete_opportunity(&self, actor: &Actor, id: Uuid) -> PortResult<Opportunity> {
        let (opportunity, _) = mutate(self.opportunities.as_ref(), id, |opp| {
            require_mutate(actor, opp.posted_by)?;
            opp.status = OpportunityStatus::Inactive;
            Ok(())
        })
        .await?;
        info!(%id, by = %actor.id, "opportunity deactivated");
        Ok(opportunity)
    }

    pub async fn apply_to_opportunity(
        &self,
        actor: &Actor,
        id: Uuid,
        request: ApplicationRequest,
    ) -> PortResult<Opportunity> {
        let applicant = self.db.get_user(actor.id).await?;
        let resume_url = request.resume_url.or_else(|| applicant.resume_url.clone());
        let now = Utc::now();

        let (opportunity, _) = mutate(self.opportunities.as_ref(), id, |opp| {
            lifecycle::apply(opp, actor.id, now, request.cover_letter.clone(), resume_url.clone())
        })
        .await?;

        if let Err(e) = self
            .db
            .increment_user_stat(actor.id, UserStat::ApplicationsMade)
            .await
        {
            warn!(user = %actor.id, error = %e, "failed to bump application counter");
        }
        if let Some(poster) = self.user_opt(opportunity.posted_by).await {
            self.notify(Template::ApplicationReceived {
                poster: &poster,
                applicant: &applicant,
                opportunity: &opportunity,
            });
        }
        info!(%id, user = %actor.id, "application submitted");
        Ok(opportunity)
    }

    pub async fn application_state(&self, actor: &Actor, id: Uuid) -> PortResult<ApplicationState> {
        let opportunity = self.opportunities.find(id).await?;
        let application = opportunity
            .applicants
            .iter()
            .rev()
            .find(|a| a.user == actor.id)
            .cloned();
        Ok(ApplicationState {
            has_applied: lifecycle::has_applied(&opportunity, actor.id),
            application,
        })
    }

    pub async fn update_applicant_status(
        &self,
        actor: &Actor,
        id: Uuid,
        user: Uuid,
        status: ApplicationStatus,
    ) -> PortResult<Opportunity> {
        let (opportunity, previous) = mutate(self.opportunities.as_ref(), id, |opp| {
            lifecycle::update_applicant_status(opp, actor, user, status)
        })
        .await?;

        if previous != status {
            if let Some(applicant) = self.user_opt(user).await {
                self.notify(Template::ApplicationStatusChanged {
                    applicant: &applicant,
                    opportunity: &opportunity,
                    status,
                });
            }
        }
        Ok(opportunity)
    }

    pub async fn respond_to_offer(
        &self,
        actor: &Actor,
        id: Uuid,
        accept: bool,
    ) -> PortResult<Opportunity> {
        let (opportunity, status) = mutate(self.opportunities.as_ref(), id, |opp| {
            lifecycle::respond_to_offer(opp, actor.id, accept)
        })
        .await?;
        info!(%id, user = %actor.id, status = status.as_str(), "offer answered");
        Ok(opportunity)
    }

    pub async fn withdraw_application(&self, actor: &Actor, id: Uuid) -> PortResult<Opportunity> {
        let (opportunity, _) = mutate(self.opportunities.as_ref(), id, |opp| {
            lifecycle::withdraw_application(opp, actor.id)
        })
        .await?;
        Ok(opportunity)
    }

    /// Owner-or-admin view of the applicant list with profiles resolved.
    pub async fn list_applicants(&self, actor: &Actor, id: Uuid) -> PortResult<Vec<ApplicantView>> {
        let opportunity = self.opportunities.find(id).await?;
        require_mutate(actor, opportunity.posted_by)?;

        let ids: Vec<Uuid> = opportunity.applicants.iter().map(|a| a.user).collect();
        let profiles: HashMap<Uuid, UserSummary> = self
            .db
            .get_users(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.summary()))
            .collect();

        Ok(opportunity
            .applicants
            .into_iter()
            .map(|applicant| ApplicantView {
                profile: profiles.get(&applicant.user).cloned(),
                applicant,
            })
            .collect())
    }

    /// Scores via the injected matcher, falling back to the in-process
    /// heuristic when it fails.
    pub async fn score_skills(&self, user_skills: &[String], opportunity_skills: &[String]) -> SkillMatch {
        match self.skill_matcher.score(user_skills, opportunity_skills).await {
            Ok(result) => result.clamped(),
            Err(PortError::Unavailable(_)) => skill_match(user_skills, opportunity_skills),
            Err(e) => {
                warn!(error = %e, "skill matcher failed; using fallback");
                skill_match(user_skills, opportunity_skills)
            }
        }
    }

    pub async fn match_opportunity(&self, actor: &Actor, id: Uuid) -> PortResult<SkillMatch> {
        let user = self.db.get_user(actor.id).await?;
        let opportunity = self.opportunities.find(id).await?;
        Ok(self
            .score_skills(&user.all_skills(), &opportunity.skills_required)
            .await)
    }

    /// Open postings the user has not applied to, ranked by skill overlap.
    pub async fn recommend_opportunities(&self, actor: &Actor) -> PortResult<Vec<Recommendation>> {
        let user = self.db.get_user(actor.id).await?;
        let skills = user.all_skills();
        if skills.is_empty() {
            return Ok(Vec::new());
        }

        let filter = ListFilter {
            listed_only: true,
            ..Default::default()
        };
        let now = Utc::now();
        let candidates: Vec<Opportunity> = self
            .opportunities
            .list(&filter, PageRequest::new(Some(1), Some(RECOMMENDATION_CANDIDATES)))
            .await?
            .items
            .into_iter()
            .filter(|o| o.deadline >= now && o.posted_by != user.id && !lifecycle::has_applied(o, user.id))
            .collect();

        let scored = join_all(candidates.into_iter().map(|opportunity| {
            let skills = &skills;
            async move {
                let skill_match = self.score_skills(skills, &opportunity.skills_required).await;
                Recommendation {
                    opportunity,
                    skill_match,
                }
            }
        }))
        .await;

        Ok(rank_recommendations(scored))
    }
}
