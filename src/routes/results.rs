use axum::extract::{Path, State};
use axum::Json;

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::models::tryon::TryOnResult;
use crate::services::lifecycle::parse_job_id;

/// GET /api/v1/results/{job_id}: Result of a succeeded job.
pub async fn get_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<TryOnResult>> {
    let job_id = parse_job_id(&job_id)?;
    Ok(Json(state.results.get_result(job_id).await?))
}
