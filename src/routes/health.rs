use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::job::JobStatus;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub processing_mode: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub catalog: ComponentHealth,
    pub jobs: JobHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub items: usize,
}

#[derive(Serialize)]
pub struct JobHealth {
    /// Jobs still in `processing` past the configured window. Nothing acts
    /// on them; this only makes them visible.
    pub stale_processing: usize,
    pub stale_after_secs: u64,
}

/// GET /health: service status with catalog and stuck-job checks.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let items = state.store.catalog_len().await;
    let catalog = ComponentHealth {
        status: if items > 0 { "ok" } else { "empty" }.to_string(),
        items,
    };

    let window = chrono::Duration::from_std(state.config.stale_job_after())
        .unwrap_or_else(|_| chrono::Duration::seconds(300));
    let stale_processing = state
        .store
        .count_stale_jobs(JobStatus::Processing, Utc::now() - window)
        .await;
    if stale_processing > 0 {
        tracing::warn!(stale_processing, "Jobs stuck in processing");
    }

    let healthy = items > 0;
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        processing_mode: state.lifecycle.processing_mode().to_string(),
        checks: HealthChecks {
            catalog,
            jobs: JobHealth {
                stale_processing,
                stale_after_secs: state.config.stale_job_secs,
            },
        },
    };

    (status_code, Json(response))
}
