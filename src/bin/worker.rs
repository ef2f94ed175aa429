//! Stand-in compositor for `PROCESSING_MODE=delegated`.
//!
//! Accepts dispatches on `POST /jobs`, pretends to composite, and reports
//! back to each job's callback URL. It produces no real images: the result
//! is either `COMPOSITOR_RESULT_URL` or the first garment image.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;
use tryon_service::{
    config::CompositorConfig,
    models::dispatch::{CompletionAck, CompletionReport, DispatchPayload},
    models::job::JobStatus,
};

const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 500;
const QUEUE_CAPACITY: usize = 256;

#[derive(Clone)]
struct WorkerState {
    queue: mpsc::Sender<DispatchPayload>,
}

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting try-on compositor worker");

    let config = CompositorConfig::from_env().expect("Failed to load configuration");
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client");

    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    tokio::spawn(run_jobs(config.clone(), http, rx));

    let app = Router::new()
        .route("/jobs", post(accept_job))
        .with_state(WorkerState { queue: tx });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Worker listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}

/// POST /jobs: queue a dispatched job. Answers before any work is done.
async fn accept_job(
    State(state): State<WorkerState>,
    Json(payload): Json<DispatchPayload>,
) -> StatusCode {
    let job_id = payload.job_id;
    match state.queue.try_send(payload) {
        Ok(()) => {
            tracing::info!(job_id = %job_id, "Job accepted");
            StatusCode::ACCEPTED
        }
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "Queue full, rejecting job");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Main processing loop, one job at a time.
async fn run_jobs(
    config: CompositorConfig,
    http: reqwest::Client,
    mut rx: mpsc::Receiver<DispatchPayload>,
) {
    while let Some(job) = rx.recv().await {
        process_job(&config, &http, job).await;
    }
    tracing::info!("Job queue closed, worker loop exiting");
}

async fn process_job(config: &CompositorConfig, http: &reqwest::Client, job: DispatchPayload) {
    tracing::info!(
        job_id = %job.job_id,
        mode = %job.mode,
        garments = job.garment_image_urls.len(),
        "Processing try-on job"
    );

    let started = CompletionReport {
        status: JobStatus::Processing,
        result_urls: Vec::new(),
        error: None,
    };
    if deliver(http, &job.callback_url, &started).await.is_none() {
        tracing::warn!(job_id = %job.job_id, "Could not report processing, continuing");
    }

    sleep(Duration::from_millis(config.processing_ms)).await;

    let report = if rand::random::<f64>() < config.fail_rate {
        CompletionReport {
            status: JobStatus::Failed,
            result_urls: Vec::new(),
            error: Some("compositor failed to render".to_string()),
        }
    } else {
        let result = config
            .result_url
            .clone()
            .or_else(|| job.garment_image_urls.first().cloned())
            .unwrap_or_else(|| job.original_image_url.clone());
        CompletionReport {
            status: JobStatus::Succeeded,
            result_urls: vec![result],
            error: None,
        }
    };

    match deliver(http, &job.callback_url, &report).await {
        Some(ack) if ack.applied => {
            tracing::info!(job_id = %job.job_id, status = %ack.status, "Job completed");
        }
        Some(ack) => {
            tracing::warn!(
                job_id = %job.job_id,
                status = %ack.status,
                "Completion ignored, job was already terminal"
            );
        }
        None => {
            tracing::error!(job_id = %job.job_id, "Giving up on completion callback");
        }
    }
}

/// Post a report to the callback URL, retrying transient failures.
async fn deliver(
    http: &reqwest::Client,
    callback_url: &str,
    report: &CompletionReport,
) -> Option<CompletionAck> {
    for attempt in 1..=MAX_RETRIES {
        let result = http
            .post(callback_url)
            .json(report)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(response) => match response.json::<CompletionAck>().await {
                Ok(ack) => return Some(ack),
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable callback acknowledgement");
                    return None;
                }
            },
            // 4xx means the service refused the report; retrying won't help.
            Err(e) if e.status().is_some_and(|s| s.is_client_error()) => {
                tracing::error!(error = %e, status = %report.status, "Callback rejected");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_retries = MAX_RETRIES,
                    "Callback failed, will retry"
                );
                sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt))).await;
            }
        }
    }
    None
}
