mod config;
mod db;
mod embeddings;
mod errors;
mod generation;
mod interview;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::embeddings::EmbeddingsClient;
use crate::generation::intake::FieldProfile;
use crate::generation::retrieval::{EvidenceStore, PgEvidenceStore};
use crate::llm_client::{LlmClient, GRADING_MODEL, SYNTHESIS_MODEL};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("architect_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Architect API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize the generation-gateway client
    let llm = LlmClient::new(config.gateway_url.clone(), config.gateway_api_key.clone());
    info!(
        "Gateway client initialized (synthesis: {}, grading: {})",
        SYNTHESIS_MODEL, GRADING_MODEL
    );

    // Embeddings are optional: without a key, retrieval degrades to sparse-only.
    let embeddings = match &config.openai_api_key {
        Some(key) => Some(EmbeddingsClient::new(key.clone())),
        None => {
            warn!("OPENAI_API_KEY not set; dense retrieval disabled, evidence will be sparse-only");
            None
        }
    };

    let evidence: Arc<dyn EvidenceStore> = Arc::new(PgEvidenceStore::new(db.clone()));

    let profile = FieldProfile::from_name(&config.interview_profile);
    info!(
        "Interview profile: {} ({} fields)",
        config.interview_profile,
        profile.fields().len()
    );

    // Build app state
    let state = AppState {
        db,
        llm,
        embeddings,
        evidence,
        profile,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
