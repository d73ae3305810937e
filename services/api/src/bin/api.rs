//! services/api/src/bin/api.rs

use planner_api_lib::{
    adapters::{MemoryPlanRepository, PgPlanRepository},
    build_backend, build_service,
    config::Config,
    error::ApiError,
    web::{build_router, AppState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use study_plan_core::PlanRepository;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(environment = ?config.environment, provider = ?config.provider, "Configuration loaded. Starting server...");

    // --- 2. Choose Storage ---
    let repo: Arc<dyn PlanRepository> = match &config.database_url {
        Some(url) => {
            info!("Connecting to database...");
            let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
            let repo = PgPlanRepository::new(pool);
            info!("Running database migrations...");
            repo.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(repo)
        }
        None => {
            warn!("DATABASE_URL is not set; plans are kept in memory only");
            Arc::new(MemoryPlanRepository::new())
        }
    };

    // --- 3. Initialize the Generation Backend & Service ---
    let backend = build_backend(&config)?;
    let service = Arc::new(build_service(&config, repo, backend));

    // --- 4. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState {
        service,
        config: config.clone(),
    });
    let app = build_router(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
