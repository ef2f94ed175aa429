use axum::extract::DefaultBodyLimit;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::config::ProcessingMode;

pub mod health;
pub mod jobs;
pub mod metrics;
pub mod products;
pub mod results;
pub mod tryon;
pub mod uploads;
pub mod webhooks;

/// Header carrying the caller's session grouping key.
pub const SESSION_HEADER: &str = "x-session-id";

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the HTTP router. The Prometheus endpoint is attached by the binary
/// since it needs the installed recorder.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    let mut api = Router::new()
        .route("/uploads", post(uploads::upload_photo))
        .route("/uploads/{asset_id}", get(uploads::get_upload))
        .route("/products", get(products::list_products))
        .route("/products/{product_id}", get(products::get_product))
        .route("/tryon", post(tryon::create_tryon))
        .route("/jobs", get(jobs::list_session_jobs))
        .route("/jobs/{job_id}", get(jobs::get_job_status))
        .route("/results/{job_id}", get(results::get_result));

    // Completion callbacks only exist when an external compositor is in play.
    if state.lifecycle.processing_mode() == ProcessingMode::Delegated {
        api = api.route(
            "/webhooks/jobs/{job_id}",
            post(webhooks::report_completion),
        );
    }

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
}

/// Session key from the request, if the client sent one.
pub(crate) fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
