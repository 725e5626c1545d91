mod config;
mod db;
mod errors;
mod intake;
mod llm_client;
mod models;
mod routes;
mod scoring;
mod session;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::intake::questions::{LlmQuestionGenerator, QuestionGenerator, StaticQuestionBank};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::scoring::{KeywordResponseScorer, LlmResponseScorer, ResponseScorer};
use crate::session::registry::SessionRegistry;
use crate::session::store::PgInterviewStore;
use crate::state::AppState;

/// Per-request bound for Claude calls. Scoring is further capped by SCORING_TIMEOUT_SECS.
const LLM_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Proctor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    let store = Arc::new(PgInterviewStore::new(db));

    // Initialize LLM client when a key is configured
    let llm = match &config.anthropic_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone(), LLM_REQUEST_TIMEOUT)
                .context("building LLM client")?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(client)
        }
        None => {
            info!("ANTHROPIC_API_KEY not set; using static questions and keyword scoring");
            None
        }
    };

    // Question source: Claude when available, static bank otherwise
    let question_generator: Arc<dyn QuestionGenerator> = match &llm {
        Some(client) => Arc::new(LlmQuestionGenerator(client.clone())),
        None => Arc::new(StaticQuestionBank),
    };

    // Answer scorer: KeywordResponseScorer by default, swap via ENABLE_LLM_SCORING
    let scorer: Arc<dyn ResponseScorer> = match (&llm, config.enable_llm_scoring) {
        (Some(client), true) => {
            info!("Using LLM response scorer");
            Arc::new(LlmResponseScorer(client.clone()))
        }
        (None, true) => {
            info!("ENABLE_LLM_SCORING set without an API key; using keyword scorer");
            Arc::new(KeywordResponseScorer)
        }
        (_, false) => Arc::new(KeywordResponseScorer),
    };

    // Build app state
    let state = AppState {
        config: config.clone(),
        sessions: SessionRegistry::with_linger(config.session_linger),
        scorer,
        question_generator,
        store,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the candidate UI has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
