use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tryon_service::app_state::AppState;
use tryon_service::config::AppConfig;
use tryon_service::routes;
use tryon_service::services::catalog;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        processing_mode = %config.processing_mode,
        "Initializing try-on service"
    );

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    let bind_addr = config.bind_addr.clone();
    let catalog_path = config.catalog_path.clone();

    let state = AppState::new(config).expect("Failed to initialize processing trigger");

    // An unreadable catalog is not fatal; /health reports it as degraded.
    match catalog::load_catalog(&catalog_path).await {
        Ok(items) => {
            let count = catalog::seed(&state.store, items).await;
            tracing::info!(count, path = %catalog_path, "Catalog loaded");
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %catalog_path, "Could not load catalog, starting empty");
        }
    }

    let app = routes::router(state).route(
        "/metrics",
        get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
