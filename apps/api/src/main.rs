mod catalog;
mod config;
mod errors;
mod matching;
mod models;
mod profile;
mod routes;
mod rules;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::load_catalog;
use crate::config::Config;
use crate::matching::config::load_match_config;
use crate::matching::embedding::build_provider;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting opmatch API v{}", env!("CARGO_PKG_VERSION"));

    // Scraped opportunities
    let catalog = load_catalog(&config.catalog_path)?;
    info!(
        "Catalog loaded: {} opportunities from {}",
        catalog.len(),
        config.catalog_path.display()
    );

    // Matching configuration, env overrides win over the file
    let match_config = load_match_config(config.match_config_path.as_deref())?
        .with_overrides(config.enable_semantic, config.match_top_k)?;
    info!(
        "Match config ready (semantic: {}, top_k: {:?})",
        match_config.enable_semantic, match_config.top_k
    );

    // Embedding backend (no-op when semantic matching is off or unconfigured)
    let embedder = build_provider(&config.embedding, match_config.enable_semantic)?;
    info!("Embedding backend: {}", embedder.name());

    let state = AppState {
        catalog: Arc::new(catalog),
        match_config: Arc::new(match_config),
        embedder,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
