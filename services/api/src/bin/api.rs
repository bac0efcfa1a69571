//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        db::DbAdapter,
        mailer::{LogNotifier, SmtpNotifier},
        memory::{MemoryDatabase, MemoryDocuments, MemoryRateLimits},
        skills_llm::{DisabledSkills, OpenAiSkillsAdapter},
        storage::{DisabledStorage, HttpBlobStorage},
    },
    config::Config,
    error::ApiError,
    web::{self, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use campus_core::ports::{
    BlobStorage, Notifier, RateLimitStore, SkillExtractionService, SkillMatcher,
};
use campus_core::{Collaboration, Event, Opportunity, Services};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const RATE_LIMIT_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(environment = ?config.environment, "Configuration loaded. Starting server...");

    // --- 2. Initialize External Collaborators ---
    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpNotifier::new(smtp)?),
        None => {
            warn!("SMTP_HOST is not set; emails will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let storage: Arc<dyn BlobStorage> = match &config.storage {
        Some(storage) => Arc::new(HttpBlobStorage::new(storage)?),
        None => {
            warn!("STORAGE_BASE_URL is not set; uploads are disabled");
            Arc::new(DisabledStorage)
        }
    };

    let (skill_extractor, skill_matcher): (Arc<dyn SkillExtractionService>, Arc<dyn SkillMatcher>) =
        match &config.openai_api_key {
            Some(key) => {
                let client = Client::with_config(OpenAIConfig::new().with_api_key(key));
                let adapter = Arc::new(OpenAiSkillsAdapter::new(client, config.ai_model.clone()));
                let extractor: Arc<dyn SkillExtractionService> = adapter.clone();
                let matcher: Arc<dyn SkillMatcher> = adapter;
                (extractor, matcher)
            }
            None => {
                warn!("OPENAI_API_KEY is not set; resume parsing and AI matching are disabled");
                let extractor: Arc<dyn SkillExtractionService> = Arc::new(DisabledSkills);
                let matcher: Arc<dyn SkillMatcher> = Arc::new(DisabledSkills);
                (extractor, matcher)
            }
        };

    // --- 3. Connect to the Store ---
    let (services, rate_limits): (Services, Arc<dyn RateLimitStore>) = match &config.database_url {
        Some(url) => {
            info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await?;
            let db = Arc::new(DbAdapter::new(pool));
            info!("Running database migrations...");
            db.run_migrations().await?;
            info!("Database migrations complete.");
            let services = Services {
                db: db.clone(),
                opportunities: Arc::new(db.documents::<Opportunity>()),
                collaborations: Arc::new(db.documents::<Collaboration>()),
                events: Arc::new(db.documents::<Event>()),
                notifier,
                storage,
                skill_extractor,
                skill_matcher,
            };
            let rate_limits: Arc<dyn RateLimitStore> = db;
            (services, rate_limits)
        }
        None => {
            warn!("DATABASE_URL is not set; using the in-memory store, data will not survive a restart");
            let services = Services {
                db: Arc::new(MemoryDatabase::new()),
                opportunities: Arc::new(MemoryDocuments::<Opportunity>::new()),
                collaborations: Arc::new(MemoryDocuments::<Collaboration>::new()),
                events: Arc::new(MemoryDocuments::<Event>::new()),
                notifier,
                storage,
                skill_extractor,
                skill_matcher,
            };
            let rate_limits: Arc<dyn RateLimitStore> = Arc::new(MemoryRateLimits::new());
            (services, rate_limits)
        }
    };

    // --- 4. Expire Old Rate-Limit Windows ---
    let purge_store = rate_limits.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RATE_LIMIT_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match purge_store.purge_expired(Utc::now()).await {
                Ok(purged) => debug!(purged, "expired rate-limit windows removed"),
                Err(e) => warn!(error = %e, "failed to purge rate-limit windows"),
            }
        }
    });

    // --- 5. Build the Shared AppState and Router ---
    let app_state = Arc::new(AppState {
        services,
        rate_limits,
        config: config.clone(),
    });
    let app = web::router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
