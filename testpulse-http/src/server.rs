use axum::{routing::get, Router};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use testpulse::{
    ActiveTestReporter, Collaborators, ContentRepository, ReportSettings, SampleSizeEstimator,
    SystemClock,
};

use crate::handlers::{health, AppState};
use crate::routes::RouteTable;

/// Wire the reporter to a repository under `data_dir` and build the router.
pub fn build_app(data_dir: &Path) -> Result<Router, Box<dyn std::error::Error>> {
    let settings = ReportSettings::load_or_default(data_dir);
    let repository = Arc::new(ContentRepository::open(data_dir)?);
    let collaborators = Collaborators::from_repository(
        repository,
        Arc::new(SampleSizeEstimator::from_settings(&settings)),
        Arc::new(SystemClock::new(settings.display_offset())),
    );

    let mut routes = RouteTable::new();
    routes.register_active_tests(&settings);

    let state = Arc::new(AppState::new(ActiveTestReporter::new(
        collaborators,
        settings,
    )));
    Ok(routes
        .into_router()
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive()))
}

pub async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = std::env::var("TESTPULSE_DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let bind_addr =
        std::env::var("TESTPULSE_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:7800".to_string());

    let app = build_app(Path::new(&data_dir))?;
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("testpulse listening on http://{} (data dir {})", bind_addr, data_dir);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
