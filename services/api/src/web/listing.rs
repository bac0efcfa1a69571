//! services/api/src/web/listing.rs
//!
//! Query parameters and handler bodies shared by the opportunity, collaboration
//! and event routes: paged listings, "mine" listings, trending and saves.

use campus_core::domain::{Document, ListFilter, Page, PageRequest};
use campus_core::services::Populated;
use campus_core::{Actor, DocumentStore};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::web::response::ApiResponse;
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Without a status only publicly listed entries are returned.
    pub status: Option<String>,
    /// Case-insensitive match on title and description.
    pub search: Option<String>,
    pub owner: Option<Uuid>,
}

impl ListQuery {
    pub fn into_parts(self) -> (ListFilter, PageRequest) {
        let filter = ListFilter {
            listed_only: self.status.is_none(),
            status: self.status,
            search: self.search,
            owner: self.owner,
            ..Default::default()
        };
        (filter, PageRequest::new(self.page, self.limit))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Relation {
    /// Entries the caller posted, created or organizes.
    #[default]
    Owner,
    /// Entries the caller applied to, joined or registered for.
    Participant,
    Saved,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MineQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub relation: Option<Relation>,
    pub status: Option<String>,
}

impl MineQuery {
    pub fn into_parts(self, actor: &Actor) -> (ListFilter, PageRequest) {
        let mut filter = ListFilter {
            status: self.status,
            ..Default::default()
        };
        match self.relation.unwrap_or_default() {
            Relation::Owner => filter.owner = Some(actor.id),
            Relation::Participant => filter.participant = Some(actor.id),
            Relation::Saved => filter.saved_by = Some(actor.id),
        }
        (filter, PageRequest::new(self.page, self.limit))
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrendingQuery {
    /// Defaults to 10, at most 50.
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SaveRequest {
    /// Omit to toggle.
    pub saved: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub saved: bool,
    pub saves_count: usize,
}

pub async fn populate_page<T: Document>(state: &AppState, page: Page<T>) -> Page<Populated<T>> {
    let Page { items, total, request } = page;
    let items = join_all(items.into_iter().map(|doc| state.services.populate(doc))).await;
    Page { items, total, request }
}

pub async fn list<T: Document>(
    state: &AppState,
    store: &dyn DocumentStore<T>,
    filter: ListFilter,
    page: PageRequest,
    message: &str,
) -> ApiResult<ApiResponse<Vec<Populated<T>>>> {
    let page = state.services.list_documents(store, &filter, page).await?;
    Ok(ApiResponse::page(message, populate_page(state, page).await))
}

pub async fn trending<T: Document>(
    state: &AppState,
    store: &dyn DocumentStore<T>,
    query: TrendingQuery,
) -> ApiResult<ApiResponse<Vec<Populated<T>>>> {
    let ranked = state.services.trending(store, query.limit).await?;
    let items = join_all(ranked.into_iter().map(|doc| state.services.populate(doc))).await;
    Ok(ApiResponse::ok("Trending", items))
}

pub async fn save<T: Document>(
    state: &AppState,
    store: &dyn DocumentStore<T>,
    actor: &Actor,
    id: Uuid,
    request: Option<SaveRequest>,
) -> ApiResult<ApiResponse<SaveResponse>> {
    let saved = request.and_then(|r| r.saved);
    let (doc, saved) = state.services.save_document(store, id, actor, saved).await?;
    let message = if saved { "Saved" } else { "Removed from saved" };
    Ok(ApiResponse::ok(
        message,
        SaveResponse {
            saved,
            saves_count: doc.saves().len(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::Role;

    #[test]
    fn public_listings_hide_unlisted_entries_unless_a_status_is_asked_for() {
        let (filter, page) = ListQuery::default().into_parts();
        assert!(filter.listed_only);
        assert_eq!(page.page, 1);

        let (filter, _) = ListQuery {
            status: Some("closed".to_string()),
            ..Default::default()
        }
        .into_parts();
        assert!(!filter.listed_only);
        assert_eq!(filter.status.as_deref(), Some("closed"));
    }

    #[test]
    fn mine_defaults_to_owned_entries() {
        let actor = Actor::new(Uuid::new_v4(), Role::Student);
        let (filter, _) = MineQuery::default().into_parts(&actor);
        assert_eq!(filter.owner, Some(actor.id));

        let (filter, _) = MineQuery {
            relation: Some(Relation::Participant),
            ..Default::default()
        }
        .into_parts(&actor);
        assert_eq!(filter.owner, None);
        assert_eq!(filter.participant, Some(actor.id));
    }
}
