//! Operations shared by every owned document type: detail views with the owner
//! resolved, listings, save toggles and trending.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::{mutate, Services};
use crate::domain::{Document, ListFilter, Page, PageRequest, UserSummary};
use crate::engagement::{self, clamp_trending_limit, rank_trending, trending_since, TRENDING_CANDIDATES};
use crate::policy::Actor;
use crate::ports::{DocumentStore, PortResult};

/// A document with its owner reference resolved. A dangling owner id yields
/// `owner: null` rather than an error.
#[derive(Debug, Clone, Serialize)]
pub struct Populated<T> {
    #[serde(flatten)]
    pub doc: T,
    pub owner: Option<UserSummary>,
}

impl Services {
    pub async fn populate<T: Document>(&self, doc: T) -> Populated<T> {
        let owner = self.user_opt(doc.owner()).await.map(|u| u.summary());
        Populated { doc, owner }
    }

    /// Detail fetch. Every call counts as a view; viewers are not deduplicated.
    pub async fn view_document<T: Document>(
        &self,
        store: &dyn DocumentStore<T>,
        id: Uuid,
    ) -> PortResult<Populated<T>> {
        let doc = store.increment_views(id).await?;
        Ok(self.populate(doc).await)
    }

    pub async fn list_documents<T: Document>(
        &self,
        store: &dyn DocumentStore<T>,
        filter: &ListFilter,
        page: PageRequest,
    ) -> PortResult<Page<T>> {
        store.list(filter, page).await
    }

    /// Bookmarks. Without `saved` the call flips the current membership; with it
    /// the membership is set explicitly. Either way the write is
    /// version-checked, so concurrent calls are applied one after the other.
    ///
    /// Returns the document and whether the actor has it saved afterwards.
    pub async fn save_document<T: Document>(
        &self,
        store: &dyn DocumentStore<T>,
        id: Uuid,
        actor: &Actor,
        saved: Option<bool>,
    ) -> PortResult<(T, bool)> {
        let user = actor.id;
        mutate(store, id, |doc: &mut T| {
            Ok(match saved {
                Some(saved) => {
                    engagement::set_saved(doc, user, saved);
                    saved
                }
                None => engagement::toggle_save(doc, user),
            })
        })
        .await
    }

    pub async fn trending<T: Document>(
        &self,
        store: &dyn DocumentStore<T>,
        limit: Option<usize>,
    ) -> PortResult<Vec<T>> {
        let candidates = store
            .listed_since(trending_since(Utc::now()), TRENDING_CANDIDATES)
            .await?;
        Ok(rank_trending(candidates, clamp_trending_limit(limit)))
    }
}
