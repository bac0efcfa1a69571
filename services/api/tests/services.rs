//! Service-level tests wired to the in-memory adapters.

use api_lib::adapters::mailer::LogNotifier;
use api_lib::adapters::memory::{MemoryDatabase, MemoryDocuments};
use api_lib::adapters::skills_llm::DisabledSkills;
use api_lib::adapters::storage::DisabledStorage;
use async_trait::async_trait;
use campus_core::domain::{CollaborationDraft, ListFilter, Page, PageRequest};
use campus_core::ports::{
    BlobStorage, DocumentStore, Notifier, PortError, PortResult,
    SkillExtractionService,
};
use campus_core::services::{mutate, InterestRequest, MAX_CAS_ATTEMPTS};
use campus_core::{Actor, Collaboration, Event, Opportunity, Role, Services, User};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Returns fixed skills until switched into failing mode.
#[derive(Default)]
struct SwitchableExtractor {
    failing: AtomicBool,
}

#[async_trait]
impl SkillExtractionService for SwitchableExtractor {
    async fn extract_skills(&self, _text: &str) -> PortResult<Vec<String>> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PortError::Unexpected("model returned malformed JSON".to_string()))
        } else {
            Ok(vec!["Rust".to_string(), "SQL".to_string()])
        }
    }
}

/// Hands back a URL derived from the key.
struct UrlStorage;

#[async_trait]
impl BlobStorage for UrlStorage {
    async fn upload(&self, key: &str, _content_type: &str, _data: Vec<u8>) -> PortResult<String> {
        Ok(format!("https://files.campus.test/{}", key))
    }

    async fn delete(&self, _key: &str) -> PortResult<()> {
        Ok(())
    }
}

/// A collection whose writes always lose the version race.
struct AlwaysStale {
    inner: MemoryDocuments<Collaboration>,
    replaces: AtomicUsize,
}

#[async_trait]
impl DocumentStore<Collaboration> for AlwaysStale {
    async fn find(&self, id: Uuid) -> PortResult<Collaboration> {
        self.inner.find(id).await
    }

    async fn insert(&self, doc: &Collaboration) -> PortResult<()> {
        self.inner.insert(doc).await
    }

    async fn replace(&self, doc: &Collaboration, _expected_version: i64) -> PortResult<Collaboration> {
        self.replaces.fetch_add(1, Ordering::SeqCst);
        Err(PortError::StaleVersion(doc.id))
    }

    async fn increment_views(&self, id: Uuid) -> PortResult<Collaboration> {
        self.inner.increment_views(id).await
    }

    async fn list(&self, filter: &ListFilter, page: PageRequest) -> PortResult<Page<Collaboration>> {
        self.inner.list(filter, page).await
    }

    async fn listed_since(&self, since: DateTime<Utc>, cap: usize) -> PortResult<Vec<Collaboration>> {
        self.inner.listed_since(since, cap).await
    }

    async fn count(&self, filter: &ListFilter) -> PortResult<u64> {
        self.inner.count(filter).await
    }
}

fn services_with(
    extractor: Arc<dyn SkillExtractionService>,
    storage: Arc<dyn BlobStorage>,
) -> Services {
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    Services {
        db: Arc::new(MemoryDatabase::new()),
        opportunities: Arc::new(MemoryDocuments::<Opportunity>::new()),
        collaborations: Arc::new(MemoryDocuments::<Collaboration>::new()),
        events: Arc::new(MemoryDocuments::<Event>::new()),
        notifier,
        storage,
        skill_extractor: extractor,
        skill_matcher: Arc::new(DisabledSkills),
    }
}

async fn member(services: &Services, name: &str) -> Actor {
    let user = User::new(name, &format!("{}@campus.test", name.to_lowercase()), Role::Student, Utc::now());
    services.db.create_user(&user, "hash").await.unwrap();
    Actor::new(user.id, user.role)
}

fn draft(team_size_required: u32) -> CollaborationDraft {
    CollaborationDraft {
        title: "Campus rover".to_string(),
        description: "Build a small autonomous rover".to_string(),
        category: None,
        skills_needed: vec!["Rust".to_string()],
        team_size_required,
    }
}

#[tokio::test]
async fn failed_extraction_still_stores_the_resume() {
    let extractor = Arc::new(SwitchableExtractor::default());
    let services = services_with(extractor.clone(), Arc::new(UrlStorage));
    let student = member(&services, "Sam").await;

    let first = services
        .upload_resume(&student, "cv.txt", "text/plain", b"Rust and SQL".to_vec())
        .await
        .unwrap();
    assert!(!first.resume_skills.is_empty());

    extractor.failing.store(true, Ordering::SeqCst);
    let second = services
        .upload_resume(&student, "cv-v2.txt", "text/plain", b"Rust, SQL and Go".to_vec())
        .await
        .unwrap();
    assert!(second.resume_url.as_deref().unwrap().ends_with("cv-v2.txt"));
    assert_ne!(second.resume_url, first.resume_url);
    assert_eq!(second.resume_skills, first.resume_skills);
}

#[tokio::test]
async fn unconfigured_storage_fails_the_upload() {
    let services = services_with(Arc::new(DisabledSkills), Arc::new(DisabledStorage));
    let student = member(&services, "Sam").await;
    let result = services
        .upload_resume(&student, "cv.txt", "text/plain", b"Rust".to_vec())
        .await;
    assert!(matches!(result, Err(PortError::Unavailable(_))));
}

#[tokio::test]
async fn mutate_gives_up_after_repeated_version_conflicts() {
    let store = AlwaysStale {
        inner: MemoryDocuments::new(),
        replaces: AtomicUsize::new(0),
    };
    let collaboration = Collaboration::new(draft(3), Uuid::new_v4(), Utc::now());
    store.insert(&collaboration).await.unwrap();

    let mut calls = 0;
    let result = mutate(&store, collaboration.id, |c| {
        calls += 1;
        c.title = "Renamed".to_string();
        Ok(())
    })
    .await;

    assert!(matches!(result, Err(PortError::Conflict(_))));
    assert_eq!(calls, MAX_CAS_ATTEMPTS);
    assert_eq!(store.replaces.load(Ordering::SeqCst), MAX_CAS_ATTEMPTS);
    assert_eq!(store.find(collaboration.id).await.unwrap().title, "Campus rover");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_never_overfill_the_team() {
    let services = services_with(Arc::new(DisabledSkills), Arc::new(UrlStorage));
    let creator = member(&services, "Cora").await;
    let first = member(&services, "Finn").await;
    let second = member(&services, "Gwen").await;

    // Room for the creator plus one.
    let collaboration = services.create_collaboration(&creator, draft(2)).await.unwrap();
    for candidate in [&first, &second] {
        services
            .express_interest(candidate, collaboration.id, InterestRequest::default())
            .await
            .unwrap();
    }

    let accepts = [first.id, second.id].map(|user| {
        let services = services.clone();
        let id = collaboration.id;
        tokio::spawn(async move { services.accept_interest(&creator, id, user, None).await })
    });
    let mut joined = 0;
    let mut full = 0;
    for accept in accepts {
        match accept.await.unwrap() {
            Ok(_) => joined += 1,
            Err(PortError::Conflict(_)) => full += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!((joined, full), (1, 1));

    let stored = services.collaborations.find(collaboration.id).await.unwrap();
    assert_eq!(stored.team_members.len(), 2);
    assert_eq!(stored.team_size.current, 2);
    assert!(stored.team_size.is_full());
}
