use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Register descriptions for the try-on metrics.
pub fn describe_metrics() {
    metrics::describe_counter!("tryon_jobs_total", "Try-on jobs created");
    metrics::describe_counter!("tryon_jobs_succeeded", "Try-on jobs that reached succeeded");
    metrics::describe_counter!("tryon_jobs_failed", "Try-on jobs that reached failed");
    metrics::describe_counter!(
        "tryon_transitions_rejected",
        "Status transitions refused (terminal job or invalid move)"
    );
    metrics::describe_counter!("tryon_assets_total", "Photos uploaded");
    metrics::describe_histogram!(
        "tryon_processing_seconds",
        "Time from job creation to terminal status"
    );
}

/// GET /metrics: Prometheus text exposition.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
