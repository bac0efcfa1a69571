//! Router-level tests against the in-memory store.

use api_lib::adapters::memory::{MemoryDatabase, MemoryDocuments, MemoryRateLimits};
use api_lib::adapters::skills_llm::DisabledSkills;
use api_lib::adapters::storage::DisabledStorage;
use api_lib::config::{Config, Environment};
use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use campus_core::ports::{Email, Notifier, PortError, PortResult};
use campus_core::{Collaboration, Event, Opportunity, Services};
use chrono::{Duration, Utc};
use futures::future::join_all;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Keeps every email; optionally reports delivery as failed.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Email>>,
    fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: Email) -> PortResult<()> {
        self.sent.lock().await.push(email);
        if self.fail {
            Err(PortError::Unexpected("smtp relay refused the message".to_string()))
        } else {
            Ok(())
        }
    }
}

impl RecordingNotifier {
    async fn reset_token(&self) -> Option<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|e| e.subject == "Reset your password")
            .and_then(|e| e.body.split("token=").nth(1))
            .map(|rest| rest.split_whitespace().next().unwrap_or_default().to_string())
    }
}

fn app_with(config: Config, notifier: Arc<RecordingNotifier>) -> Router {
    let services = Services {
        db: Arc::new(MemoryDatabase::new()),
        opportunities: Arc::new(MemoryDocuments::<Opportunity>::new()),
        collaborations: Arc::new(MemoryDocuments::<Collaboration>::new()),
        events: Arc::new(MemoryDocuments::<Event>::new()),
        notifier,
        storage: Arc::new(DisabledStorage),
        skill_extractor: Arc::new(DisabledSkills),
        skill_matcher: Arc::new(DisabledSkills),
    };
    let state = Arc::new(AppState {
        services,
        rate_limits: Arc::new(MemoryRateLimits::new()),
        config: Arc::new(config),
    });
    web::router(state).unwrap()
}

fn app() -> Router {
    app_with(Config::for_tests(), Arc::new(RecordingNotifier::default()))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Signs a user up and returns their session token.
async fn signup(app: &Router, name: &str, role: &str) -> String {
    let email = format!("{}@campus.test", name.to_lowercase());
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/auth/signup",
        None,
        Some(json!({ "name": name, "email": email, "password": "correct-horse", "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn post_opportunity(app: &Router, token: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/opportunities",
        Some(token),
        Some(json!({
            "title": "Backend intern",
            "company": "Acme",
            "description": "Build services in Rust",
            "skillsRequired": ["Rust", "SQL"],
            "deadline": (Utc::now() + Duration::days(14)).to_rfc3339(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn applying_returns_the_envelope_and_records_the_applicant() {
    let app = app();
    let recruiter = signup(&app, "Rita", "recruiter").await;
    let student = signup(&app, "Sam", "student").await;
    let id = post_opportunity(&app, &recruiter).await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/v1/opportunities/{}/apply", id),
        Some(&student),
        Some(json!({ "coverLetter": "I like Rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["statusCode"], 201);
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());
    assert_eq!(body["data"]["applicants"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["applicants"][0]["status"], "pending");

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/v1/opportunities/{}/apply", id),
        Some(&student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, me) = call(&app, Method::GET, "/api/v1/auth/me", Some(&student), None).await;
    assert_eq!(me["data"]["stats"]["applicationsMade"], 1);
}

#[tokio::test]
async fn public_listing_is_paginated() {
    let app = app();
    let recruiter = signup(&app, "Rita", "recruiter").await;
    for _ in 0..3 {
        post_opportunity(&app, &recruiter).await;
    }

    let (status, body) = call(&app, Method::GET, "/api/v1/opportunities?page=1&limit=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["hasNextPage"], true);
    assert_eq!(body["pagination"]["hasPrevPage"], false);
    assert_eq!(body["data"][0]["owner"]["name"], "Rita");
}

#[tokio::test]
async fn concurrent_applications_from_different_users_all_persist() {
    let app = app();
    let recruiter = signup(&app, "Rita", "recruiter").await;
    let id = post_opportunity(&app, &recruiter).await;

    let mut students = Vec::new();
    for i in 0..6 {
        students.push(signup(&app, &format!("Student{}", i), "student").await);
    }

    let uri = format!("/api/v1/opportunities/{}/apply", id);
    let results = join_all(students.iter().map(|token| {
        let app = app.clone();
        let uri = uri.clone();
        let token = token.clone();
        async move { call(&app, Method::POST, &uri, Some(&token), None).await.0 }
    }))
    .await;
    assert!(results.iter().all(|s| *s == StatusCode::CREATED), "{:?}", results);

    let (_, body) = call(&app, Method::GET, &format!("/api/v1/opportunities/{}", id), None, None).await;
    assert_eq!(body["data"]["applicants"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn concurrent_explicit_saves_are_all_kept() {
    let app = app();
    let organizer = signup(&app, "Olga", "student").await;
    let id = post_opportunity(&app, &organizer).await;

    let mut savers = Vec::new();
    for i in 0..5 {
        savers.push(signup(&app, &format!("Saver{}", i), "student").await);
    }

    let uri = format!("/api/v1/opportunities/{}/save", id);
    join_all(savers.iter().map(|token| {
        let app = app.clone();
        let uri = uri.clone();
        let token = token.clone();
        async move { call(&app, Method::POST, &uri, Some(&token), Some(json!({ "saved": true }))).await }
    }))
    .await;

    // A repeated explicit save is a no-op.
    let (status, body) = call(&app, Method::POST, &uri, Some(&savers[0]), Some(json!({ "saved": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["saved"], true);
    assert_eq!(body["data"]["savesCount"], 5);
}

#[tokio::test]
async fn two_concurrent_toggles_cancel_out() {
    let app = app();
    let poster = signup(&app, "Pat", "recruiter").await;
    let student = signup(&app, "Sam", "student").await;
    let id = post_opportunity(&app, &poster).await;
    let uri = format!("/api/v1/opportunities/{}/save", id);

    let (first, second) = tokio::join!(
        call(&app, Method::POST, &uri, Some(&student), None),
        call(&app, Method::POST, &uri, Some(&student), None),
    );
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_ne!(first.1["data"]["saved"], second.1["data"]["saved"]);

    let (_, body) = call(&app, Method::GET, &format!("/api/v1/opportunities/{}", id), None, None).await;
    assert_eq!(body["data"]["saves"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 401);

    let (status, _) = call(&app, Method::GET, "/api/v1/auth/me", Some("not-a-session"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = app();
    let token = signup(&app, "Lee", "student").await;
    let (status, _) = call(&app, Method::POST, "/api/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn excess_requests_are_rejected() {
    let mut config = Config::for_tests();
    config.rate_limit_max_requests = 3;
    let app = app_with(config, Arc::new(RecordingNotifier::default()));

    for _ in 0..3 {
        let (status, _) = call(&app, Method::GET, "/api/v1/events", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = call(&app, Method::GET, "/api/v1/events", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["statusCode"], 429);
}

#[tokio::test]
async fn failed_reset_email_discards_the_token() {
    let notifier = Arc::new(RecordingNotifier {
        fail: true,
        ..Default::default()
    });
    let app = app_with(Config::for_tests(), notifier.clone());
    signup(&app, "Fay", "student").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/auth/forgot-password",
        None,
        Some(json!({ "email": "fay@campus.test" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    let token = notifier.reset_token().await.unwrap();
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/auth/reset-password",
        None,
        Some(json!({ "token": token, "newPassword": "another-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn password_reset_replaces_the_password_and_revokes_sessions() {
    let notifier = Arc::new(RecordingNotifier::default());
    let app = app_with(Config::for_tests(), notifier.clone());
    let session = signup(&app, "Max", "student").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/auth/forgot-password",
        None,
        Some(json!({ "email": "MAX@campus.test" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Unknown addresses get the same answer.
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/auth/forgot-password",
        None,
        Some(json!({ "email": "nobody@campus.test" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let token = notifier.reset_token().await.unwrap();
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/auth/reset-password",
        None,
        Some(json!({ "token": token, "newPassword": "brand-new-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, Method::GET, "/api/v1/auth/me", Some(&session), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "max@campus.test", "password": "brand-new-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn messages_flow_between_two_users() {
    let app = app();
    let alice = signup(&app, "Alice", "student").await;
    let bob = signup(&app, "Bob", "student").await;
    let (_, me) = call(&app, Method::GET, "/api/v1/auth/me", Some(&bob), None).await;
    let bob_id = me["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/messages",
        Some(&alice),
        Some(json!({ "receiver": bob_id, "content": "Want to team up?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, unread) = call(&app, Method::GET, "/api/v1/messages/unread-count", Some(&bob), None).await;
    assert_eq!(unread["data"]["count"], 1);

    let (_, conversations) = call(&app, Method::GET, "/api/v1/messages/conversations", Some(&bob), None).await;
    assert_eq!(conversations["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admin_routes_are_forbidden_to_students() {
    let app = app();
    let student = signup(&app, "Sam", "student").await;
    let (status, _) = call(&app, Method::GET, "/api/v1/admin/overview", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_input_is_answered_with_the_envelope() {
    let app = app();
    let recruiter = signup(&app, "Rita", "recruiter").await;
    let student = signup(&app, "Sam", "student").await;
    let id = post_opportunity(&app, &recruiter).await;
    let (_, me) = call(&app, Method::GET, "/api/v1/auth/me", Some(&student), None).await;
    let student_id = me["data"]["id"].as_str().unwrap().to_string();
    call(
        &app,
        Method::POST,
        &format!("/api/v1/opportunities/{}/apply", id),
        Some(&student),
        None,
    )
    .await;

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/opportunities/{}/applicants/{}", id, student_id),
        Some(&recruiter),
        Some(json!({ "status": "hired" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 400);
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());

    let (status, body) = call(&app, Method::GET, "/api/v1/opportunities/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 400);

    let (status, body) = call(&app, Method::GET, "/api/v1/opportunities?page=first", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn unknown_routes_and_methods_are_enveloped() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/v1/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 404);

    let (status, body) = call(&app, Method::GET, "/not-under-the-api", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["statusCode"], 404);

    let (status, body) = call(&app, Method::DELETE, "/api/v1/events/trending", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 405);
}

#[tokio::test]
async fn error_details_are_only_exposed_in_development() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/v1/opportunities/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let mut config = Config::for_tests();
    config.environment = Environment::Production;
    let app = app_with(config, Arc::new(RecordingNotifier::default()));
    let (status, body) = call(&app, Method::GET, "/api/v1/opportunities/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("error").is_none());
    assert_eq!(body["statusCode"], 400);
}
