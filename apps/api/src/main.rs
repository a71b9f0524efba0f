mod analysis;
mod cache;
mod config;
mod errors;
mod extract;
mod fingerprint;
mod llm_client;
mod models;
mod pipeline;
mod retry;
mod routes;
mod sections;
mod state;
mod storage;
mod theme;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::AnalysisService;
use crate::cache::ExtractionCache;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::pipeline::DocumentPipeline;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::build_backend;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on invalid or missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize cache backends
    let primary = build_backend(config.storage.primary, &config.storage).await?;
    let fallback = match config.storage.fallback {
        Some(kind) => Some(build_backend(kind, &config.storage).await?),
        None => None,
    };
    info!(
        primary = primary.name(),
        fallback = ?fallback.as_ref().map(|b| b.name()),
        "Cache backends initialized"
    );
    let cache = ExtractionCache::new(primary, fallback);

    // Initialize the optional LLM client
    let llm = config.anthropic_api_key.clone().map(|key| {
        let client = LlmClient::new(key, config.llm_timeout);
        info!("LLM client initialized (model: {})", client.model());
        client
    });
    if llm.is_none() {
        info!("ANTHROPIC_API_KEY not set; using heuristic structuring only");
    }
    // The overall bound covers every attempt the client may make.
    let analysis_timeout = llm
        .as_ref()
        .map_or(config.llm_timeout, LlmClient::call_budget);
    let analysis = AnalysisService::new(llm, analysis_timeout);

    let state = AppState {
        pipeline: DocumentPipeline::new(cache, analysis),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
