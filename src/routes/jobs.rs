use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::tryon::{JobListResponse, JobStatusResponse};
use crate::routes::{session_from_headers, SESSION_HEADER};
use crate::services::lifecycle::parse_job_id;

/// GET /api/v1/jobs/{job_id}: Poll job status. No side effects.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<JobStatusResponse>> {
    let job_id = parse_job_id(&job_id)?;
    Ok(Json(state.lifecycle.get_status(job_id).await?))
}

/// GET /api/v1/jobs: Jobs created under the caller's session.
pub async fn list_session_jobs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<JobListResponse>> {
    let session_id = session_from_headers(&headers)
        .ok_or_else(|| AppError::BadRequest(format!("{SESSION_HEADER} header is required")))?;

    let items = state.lifecycle.list_session_jobs(&session_id).await;
    Ok(Json(JobListResponse { items }))
}
