use anyhow::{Context, Result};
use axum::http::Method;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod analytics;
mod catalog;
mod config;
mod error;
mod orchestrator;
mod personalization;
mod routes;
mod tavus;

use analytics::{AnalyticsRecorder, AnalyticsStore};
use catalog::ArcCatalog;
use config::AppConfig;
use orchestrator::CallOrchestrator;
use tavus::TavusClient;

// Application state shared by all handlers
pub struct AppState {
    pub config: AppConfig,
    pub catalog: Arc<ArcCatalog>,
    pub tavus: TavusClient,
    pub analytics: Arc<AnalyticsStore>,
    pub orchestrator: CallOrchestrator,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "santa_api=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Santa API...");

    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::from_env();
    info!("TAVUS_API_KEY present: {}", config.tavus_api_key.is_some());
    info!(
        "TAVUS_PERSONA_ID present: {}",
        config.tavus_persona_id.is_some()
    );

    // The catalog is required; refuse to start without a valid one
    let catalog = Arc::new(
        ArcCatalog::load(&config.catalog_path)
            .with_context(|| format!("loading conversation arcs from {}", config.catalog_path))?,
    );

    let analytics = Arc::new(AnalyticsStore::new());
    let recorder = AnalyticsRecorder::spawn(analytics.clone());
    let tavus = TavusClient::new(config.tavus_base_url.clone());
    let orchestrator =
        CallOrchestrator::new(config.clone(), catalog.clone(), tavus.clone(), recorder);

    let port = config.port;
    let state = Arc::new(AppState {
        config,
        catalog,
        tavus,
        analytics,
        orchestrator,
    });

    // Build the router with CORS open to the frontend
    let app = routes::router(state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any),
    );

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
