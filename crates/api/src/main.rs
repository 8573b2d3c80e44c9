//! PR Metrics API Server

use axum::{
    routing::{get, post},
    Router,
};
use processor::{SyncConfig, SyncService};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

mod error;
mod presenters;
mod query;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("processor=debug".parse()?)
                .add_directive("api=debug".parse()?),
        )
        .init();

    info!("📊 Starting PR Metrics API");

    let config = common::Config::from_env();
    config.validate()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    // Start background sync service (if enabled)
    match SyncConfig::from_config(&config) {
        Some(sync_config) => {
            info!(
                "📡 Background sync enabled (every {} hours, {} repos)",
                config.sync_interval_hours,
                sync_config.repos.len()
            );
            let sync_service = SyncService::new(pool.clone(), sync_config);
            tokio::spawn(async move {
                sync_service.run().await;
            });
        }
        None => info!("📡 Background sync disabled (SYNC_INTERVAL_HOURS=0)"),
    }

    let state = Arc::new(AppState::new(config.clone(), pool));

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/pull_requests", get(routes::pull_requests::list))
        .route(
            "/api/pull_requests/:id/metrics",
            get(routes::pull_requests::metrics),
        )
        .route(
            "/api/pull_requests/:id/insights",
            get(routes::pull_requests::insights),
        )
        .route("/api/metrics/cycle_time", get(routes::metrics::cycle_time))
        .route("/api/metrics/review_time", get(routes::metrics::review_time))
        .route(
            "/api/analytics/team_metrics",
            get(routes::analytics::team_metrics),
        )
        .route(
            "/api/analytics/developer_metrics",
            get(routes::analytics::developer_metrics),
        )
        .route(
            "/api/analytics/developer_metrics/:developer",
            get(routes::analytics::developer),
        )
        .route(
            "/api/analytics/repository_metrics",
            get(routes::analytics::repository_metrics),
        )
        .route(
            "/api/analytics/repository_metrics/:repository",
            get(routes::analytics::repository),
        )
        .route("/api/analytics/trends", get(routes::analytics::trends))
        .route("/api/collect/:owner/:name", post(routes::collect::trigger))
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        );

    let addr = format!("{}:{}", config.host, config.port);
    info!("🚀 Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
