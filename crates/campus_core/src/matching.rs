//! crates/campus_core/src/matching.rs
//!
//! In-process skill matching, used directly or as the fallback when the AI
//! matcher is unavailable.
//!
//! A user skill counts as matching when its lowercase form occurs anywhere in
//! the lowercase, space-joined opportunity skill text. This is a heuristic and
//! produces false positives when a skill is a substring of an unrelated word.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Opportunity;

pub const MIN_RECOMMENDATION_SCORE: u8 = 40;
pub const MAX_RECOMMENDATIONS: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkillMatch {
    /// Always within 0..=100.
    pub match_percentage: u8,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

impl SkillMatch {
    /// Clamps a score reported by an external matcher into range.
    pub fn clamped(mut self) -> Self {
        self.match_percentage = self.match_percentage.min(100);
        self
    }
}

pub fn skill_match(user_skills: &[String], opportunity_skills: &[String]) -> SkillMatch {
    let haystack = opportunity_skills.join(" ").to_lowercase();

    let matching_skills: Vec<String> = user_skills
        .iter()
        .filter(|skill| {
            let needle = skill.trim().to_lowercase();
            !needle.is_empty() && haystack.contains(&needle)
        })
        .cloned()
        .collect();

    let lowered_matches: Vec<String> = matching_skills.iter().map(|s| s.trim().to_lowercase()).collect();
    let missing_skills = opportunity_skills
        .iter()
        .filter(|required| {
            let required = required.to_lowercase();
            !lowered_matches.iter().any(|m| required.contains(m.as_str()))
        })
        .cloned()
        .collect();

    let match_percentage = if user_skills.is_empty() {
        0
    } else {
        (100.0 * matching_skills.len() as f64 / user_skills.len() as f64).round() as u8
    };

    SkillMatch {
        match_percentage,
        matching_skills,
        missing_skills,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub opportunity: Opportunity,
    #[serde(flatten)]
    pub skill_match: SkillMatch,
}

/// Drops weak matches, sorts strongest first and caps the list.
pub fn rank_recommendations(mut scored: Vec<Recommendation>) -> Vec<Recommendation> {
    scored.retain(|r| r.skill_match.match_percentage >= MIN_RECOMMENDATION_SCORE);
    scored.sort_by(|a, b| {
        b.skill_match
            .match_percentage
            .cmp(&a.skill_match.match_percentage)
            .then_with(|| a.opportunity.deadline.cmp(&b.opportunity.deadline))
    });
    scored.truncate(MAX_RECOMMENDATIONS);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OpportunityDraft, OpportunityKind};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn skills(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn react_node_against_react_mongodb() {
        let m = skill_match(&skills(&["React", "Node.js"]), &skills(&["react", "mongodb"]));
        assert_eq!(m.matching_skills, skills(&["React"]));
        assert_eq!(m.match_percentage, 50);
        assert_eq!(m.missing_skills, skills(&["mongodb"]));
    }

    #[test]
    fn empty_user_skills_score_zero() {
        let m = skill_match(&[], &skills(&["rust"]));
        assert_eq!(m.match_percentage, 0);
        assert!(m.matching_skills.is_empty());
    }

    #[test]
    fn score_stays_in_range() {
        let m = skill_match(&skills(&["a", "b", "c"]), &skills(&["abc"]));
        assert_eq!(m.match_percentage, 100);
        let m = skill_match(&skills(&["go", "c", "java"]), &skills(&[]));
        assert_eq!(m.match_percentage, 0);
        assert_eq!(SkillMatch { match_percentage: 250, ..Default::default() }.clamped().match_percentage, 100);
    }

    #[test]
    fn substring_matching_is_case_insensitive() {
        let m = skill_match(&skills(&["JAVA"]), &skills(&["JavaScript"]));
        assert_eq!(m.match_percentage, 100);
    }

    fn recommendation(score: u8) -> Recommendation {
        Recommendation {
            opportunity: Opportunity::new(
                OpportunityDraft {
                    title: format!("score {}", score),
                    company: "Acme".into(),
                    description: String::new(),
                    kind: OpportunityKind::Internship,
                    location: None,
                    is_remote: false,
                    stipend: None,
                    skills_required: vec![],
                    deadline: Utc::now() + Duration::days(1),
                },
                Uuid::new_v4(),
                Utc::now(),
            ),
            skill_match: SkillMatch {
                match_percentage: score,
                ..Default::default()
            },
        }
    }

    #[test]
    fn recommendations_are_filtered_sorted_and_capped() {
        let ranked = rank_recommendations(vec![recommendation(39), recommendation(40), recommendation(90)]);
        let scores: Vec<_> = ranked.iter().map(|r| r.skill_match.match_percentage).collect();
        assert_eq!(scores, vec![90, 40]);

        let many = (0..30).map(|_| recommendation(75)).collect();
        assert_eq!(rank_recommendations(many).len(), MAX_RECOMMENDATIONS);
    }
}
