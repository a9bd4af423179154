mod config;
mod db;
mod diff;
mod errors;
mod events;
mod jobs;
mod llm_client;
mod models;
mod optimization;
mod rate_limit;
mod resumes;
mod routes;
mod shutdown;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::events::JobEvents;
use crate::llm_client::gemini::GeminiBackend;
use crate::llm_client::pacing::{TokenBucket, TokioSleeper};
use crate::llm_client::AiClient;
use crate::optimization::batch::BatchRunner;
use crate::optimization::optimizer::Optimizer;
use crate::rate_limit::RateLimits;
use crate::routes::build_router;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use crate::store::postgres::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (migrations run here)
    let pool = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(pool.clone()));

    // Initialize AI client, sharing one token bucket across every clone
    let limiter = Arc::new(TokenBucket::per_minute(
        config.ai_burst,
        config.ai_requests_per_minute,
    ));
    let sleeper = Arc::new(TokioSleeper);
    let ai = AiClient::new(Arc::new(GeminiBackend::new(config.gemini_api_key.clone())?))
        .with_rate_limiter(limiter)
        .with_sleeper(sleeper.clone());
    info!(
        "AI client initialized (model: {}, {} req/min, burst {})",
        ai.model(),
        config.ai_requests_per_minute,
        config.ai_burst
    );

    // Change feed shared by the SSE endpoint and the optimizer
    let events = JobEvents::new();

    let optimizer = Optimizer::new(store.clone(), ai).with_observer(Arc::new(events.clone()));
    let batch = BatchRunner::new(optimizer.clone(), sleeper, config.batch_pacing);

    // Per-client HTTP limits, keyed by peer IP
    let rate_limits = RateLimits::new(
        config.api_rate_limit,
        config.optimize_rate_limit,
        config.rate_limit_window,
    );

    // Build app state
    let state = AppState {
        store,
        optimizer,
        batch,
        events,
        rate_limits,
        config: config.clone(),
        started_at: Instant::now(),
    };

    let cors = match &config.frontend_url {
        Some(origin) => CorsLayer::permissive().allow_origin(
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("FRONTEND_URL '{origin}' is not a valid origin"))?,
        ),
        None => CorsLayer::permissive(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Closing database connection pool...");
    pool.close().await;
    info!("Graceful shutdown completed");

    Ok(())
}
