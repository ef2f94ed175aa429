//! Processing triggers: how a queued job actually gets worked on.
//!
//! Exactly one variant is active per deployment, chosen from
//! [`ProcessingMode`] at startup. Both only ever change job status through
//! [`JobLifecycle::apply_transition`].

use rand::Rng;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

use crate::config::{AppConfig, ProcessingMode};
use crate::models::dispatch::DispatchPayload;
use crate::models::job::{Transition, TryOnMode};
use crate::services::lifecycle::{JobError, JobLifecycle};

/// Resolved inputs for one job, built by the lifecycle manager at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingRequest {
    pub job_id: Uuid,
    pub mode: TryOnMode,
    pub original_image_url: String,
    pub garment_image_urls: Vec<String>,
}

pub enum ProcessingTrigger {
    Simulated(SimulatedTrigger),
    Delegated(DelegatedTrigger),
}

impl ProcessingTrigger {
    pub fn from_config(config: &AppConfig) -> Result<Self, TriggerError> {
        match config.processing_mode {
            ProcessingMode::Simulated => Ok(Self::Simulated(SimulatedTrigger {
                delay_min: Duration::from_millis(config.simulated_delay_min_ms),
                delay_max: Duration::from_millis(config.simulated_delay_max_ms),
                result_url: config.simulated_result_url.clone(),
            })),
            ProcessingMode::Delegated => {
                let worker_url = config
                    .worker_url
                    .clone()
                    .ok_or(TriggerError::MissingWorkerUrl)?;
                let http = Client::builder()
                    .timeout(config.dispatch_timeout())
                    .build()
                    .map_err(TriggerError::Http)?;
                Ok(Self::Delegated(DelegatedTrigger {
                    http,
                    worker_url,
                    public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
                }))
            }
        }
    }

    pub fn mode(&self) -> ProcessingMode {
        match self {
            Self::Simulated(_) => ProcessingMode::Simulated,
            Self::Delegated(_) => ProcessingMode::Delegated,
        }
    }

    /// Start processing a freshly queued job without waiting for it.
    pub fn invoke(&self, lifecycle: Arc<JobLifecycle>, request: ProcessingRequest) {
        match self {
            Self::Simulated(trigger) => trigger.invoke(lifecycle, request),
            Self::Delegated(trigger) => trigger.invoke(lifecycle, request),
        }
    }
}

/// Completes jobs after a random delay with a placeholder result.
///
/// There is no retry: if the task dies between the two transitions the job
/// stays in `processing`.
pub struct SimulatedTrigger {
    delay_min: Duration,
    delay_max: Duration,
    result_url: String,
}

impl SimulatedTrigger {
    fn pick_delay(&self) -> Duration {
        let min = self.delay_min.as_millis() as u64;
        let max = self.delay_max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    fn invoke(&self, lifecycle: Arc<JobLifecycle>, request: ProcessingRequest) {
        let delay = self.pick_delay();
        let result_urls = vec![self.result_url.clone()];
        let job_id = request.job_id;

        tokio::spawn(async move {
            if let Err(e) = lifecycle
                .apply_transition(job_id, Transition::processing())
                .await
            {
                tracing::warn!(job_id = %job_id, error = %e, "Simulated processing could not start");
                return;
            }

            tracing::debug!(
                job_id = %job_id,
                delay_ms = delay.as_millis() as u64,
                garments = request.garment_image_urls.len(),
                "Simulating compositor"
            );
            sleep(delay).await;

            if let Err(e) = lifecycle
                .apply_transition(job_id, Transition::succeeded(result_urls))
                .await
            {
                tracing::warn!(job_id = %job_id, error = %e, "Simulated completion not applied");
            }
        });
    }
}

/// Hands jobs to an external compositor. Completion arrives later through
/// the webhook; only a failed dispatch changes status here.
#[derive(Clone)]
pub struct DelegatedTrigger {
    http: Client,
    worker_url: String,
    public_base_url: String,
}

impl DelegatedTrigger {
    pub fn callback_url(&self, job_id: Uuid) -> String {
        format!("{}/api/v1/webhooks/jobs/{}", self.public_base_url, job_id)
    }

    /// Send the work order. Any non-2xx answer counts as a failure.
    pub async fn dispatch(&self, request: &ProcessingRequest) -> Result<(), TriggerError> {
        let payload = DispatchPayload {
            job_id: request.job_id,
            mode: request.mode,
            original_image_url: request.original_image_url.clone(),
            garment_image_urls: request.garment_image_urls.clone(),
            callback_url: self.callback_url(request.job_id),
        };

        let response = self
            .http
            .post(&self.worker_url)
            .json(&payload)
            .send()
            .await
            .map_err(TriggerError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TriggerError::Rejected(status));
        }
        Ok(())
    }

    fn invoke(&self, lifecycle: Arc<JobLifecycle>, request: ProcessingRequest) {
        let trigger = self.clone();

        tokio::spawn(async move {
            let job_id = request.job_id;
            match trigger.dispatch(&request).await {
                Ok(()) => {
                    tracing::info!(
                        job_id = %job_id,
                        worker_url = %trigger.worker_url,
                        "Job dispatched to compositor"
                    );
                }
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Compositor dispatch failed");
                    let reason = format!("dispatch failed: {e}");
                    match lifecycle.apply_transition(job_id, Transition::failed(reason)).await {
                        Ok(_) | Err(JobError::AlreadyTerminal { .. }) => {}
                        Err(e) => {
                            tracing::error!(job_id = %job_id, error = %e, "Could not fail job after dispatch error");
                        }
                    }
                }
            }
        });
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Compositor rejected dispatch with status {0}")]
    Rejected(StatusCode),

    #[error("Delegated processing requires a worker URL")]
    MissingWorkerUrl,
}
