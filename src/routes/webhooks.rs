use axum::extract::{Path, State};
use axum::Json;

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::models::dispatch::{CompletionAck, CompletionReport};
use crate::models::job::Transition;
use crate::services::lifecycle::{parse_job_id, JobError};

/// POST /api/v1/webhooks/jobs/{job_id}: Compositor reports progress or
/// completion.
///
/// Unauthenticated: anyone holding the job id can report. A report for a
/// job that is already terminal is acknowledged with `applied: false`.
pub async fn report_completion(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(report): Json<CompletionReport>,
) -> AppResult<Json<CompletionAck>> {
    let job_id = parse_job_id(&job_id)?;
    tracing::info!(job_id = %job_id, status = %report.status, "Compositor callback received");

    let transition = Transition {
        status: report.status,
        result_urls: report.result_urls,
        error: report.error,
    };

    match state.lifecycle.apply_transition(job_id, transition).await {
        Ok(job) => Ok(Json(CompletionAck {
            job_id,
            status: job.status,
            applied: true,
        })),
        Err(JobError::AlreadyTerminal { status, .. }) => Ok(Json(CompletionAck {
            job_id,
            status,
            applied: false,
        })),
        Err(e) => Err(e.into()),
    }
}
