use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod server;

use crate::config::Config;
use crate::db::{MongoLifespan, ProductStore};

/// Shared application state; cheap to clone since the store lives behind an Arc.
#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,my_store_api=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  {:<20} · Rust + Axum  ║", handlers::TITLE);
    info!("║  v{:<35}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let lifespan = MongoLifespan::new(config);
    server::serve(listener, &lifespan, server::shutdown_signal()).await
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // ── Status ──────────────────────────────────────────────────────────
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))

        // ── Products CRUD ───────────────────────────────────────────────────
        .merge(handlers::products::router())

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
