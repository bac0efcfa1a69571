//! crates/campus_core/src/engagement.rs
//!
//! Save toggles and trending ranking for owned documents. View counting is a
//! single atomic store operation (`DocumentStore::increment_views`).

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::Document;

pub const TRENDING_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_TRENDING_LIMIT: usize = 10;
pub const MAX_TRENDING_LIMIT: usize = 50;
/// Upper bound on candidates pulled from the store before ranking.
pub const TRENDING_CANDIDATES: usize = 500;

const SAVE_WEIGHT: u64 = 3;
const ENGAGEMENT_WEIGHT: u64 = 5;

/// Flips the user's membership in `saves` and returns the new membership.
pub fn toggle_save<T: Document>(doc: &mut T, user: Uuid) -> bool {
    let saves = doc.saves_mut();
    if saves.remove(&user) {
        false
    } else {
        saves.insert(user);
        true
    }
}

/// Idempotent form of the toggle: sets membership to `saved`. Returns whether
/// anything changed.
pub fn set_saved<T: Document>(doc: &mut T, user: Uuid, saved: bool) -> bool {
    let saves = doc.saves_mut();
    if saved {
        saves.insert(user)
    } else {
        saves.remove(&user)
    }
}

pub fn trending_score<T: Document>(doc: &T) -> u64 {
    doc.views() + SAVE_WEIGHT * doc.saves().len() as u64 + ENGAGEMENT_WEIGHT * doc.engagement() as u64
}

pub fn trending_since(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(TRENDING_WINDOW_DAYS)
}

pub fn clamp_trending_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_TRENDING_LIMIT)
        .clamp(1, MAX_TRENDING_LIMIT)
}

/// Ranks listed documents by score (highest first, newest on ties) and keeps
/// the top `limit`.
pub fn rank_trending<T: Document>(mut docs: Vec<T>, limit: usize) -> Vec<T> {
    docs.retain(|d| d.is_listed());
    docs.sort_by(|a, b| {
        trending_score(b)
            .cmp(&trending_score(a))
            .then_with(|| b.created_at().cmp(&a.created_at()))
    });
    docs.truncate(limit);
    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Opportunity, OpportunityDraft, OpportunityKind, OpportunityStatus};

    fn opportunity(title: &str) -> Opportunity {
        Opportunity::new(
            OpportunityDraft {
                title: title.into(),
                company: "Acme".into(),
                description: String::new(),
                kind: OpportunityKind::Job,
                location: None,
                is_remote: false,
                stipend: None,
                skills_required: vec![],
                deadline: Utc::now() + Duration::days(10),
            },
            Uuid::new_v4(),
            Utc::now(),
        )
    }

    #[test]
    fn save_toggle_is_its_own_inverse() {
        let mut opp = opportunity("a");
        let user = Uuid::new_v4();
        let before = opp.saves.clone();
        assert!(toggle_save(&mut opp, user));
        assert!(!toggle_save(&mut opp, user));
        assert_eq!(opp.saves, before);
    }

    #[test]
    fn set_saved_is_idempotent() {
        let mut opp = opportunity("a");
        let user = Uuid::new_v4();
        assert!(set_saved(&mut opp, user, true));
        assert!(!set_saved(&mut opp, user, true));
        assert!(opp.saves.contains(&user));
        assert!(set_saved(&mut opp, user, false));
        assert!(!set_saved(&mut opp, user, false));
    }

    #[test]
    fn trending_orders_by_engagement_and_drops_unlisted() {
        let mut quiet = opportunity("quiet");
        quiet.views = 2;
        let mut busy = opportunity("busy");
        busy.views = 10;
        busy.saves.insert(Uuid::new_v4());
        let mut hidden = opportunity("hidden");
        hidden.views = 1000;
        hidden.status = OpportunityStatus::Inactive;

        let ranked = rank_trending(vec![quiet, hidden, busy], 10);
        let titles: Vec<_> = ranked.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, vec!["busy", "quiet"]);
    }

    #[test]
    fn trending_is_capped() {
        let docs = (0..5).map(|i| opportunity(&i.to_string())).collect();
        assert_eq!(rank_trending(docs, 3).len(), 3);
        assert_eq!(clamp_trending_limit(Some(1000)), MAX_TRENDING_LIMIT);
        assert_eq!(clamp_trending_limit(None), DEFAULT_TRENDING_LIMIT);
    }
}
