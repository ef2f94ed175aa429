use reqwest::Url;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{AppConfig, ProcessingMode};
use crate::models::asset;
use crate::models::job::{
    GarmentRef, JobStatus, Transition, TransitionRejection, TryOnJob, TryOnMode,
};
use crate::models::tryon::JobStatusResponse;
use crate::services::trigger::{ProcessingRequest, ProcessingTrigger};
use crate::store::EntityStore;

/// Input for creating a try-on job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub session_id: String,
    /// Asset id as the client sent it. Resolved during validation.
    pub asset_id: String,
    pub garments: Vec<GarmentRef>,
    pub mode: TryOnMode,
}

/// References resolved while validating a new job.
struct ResolvedJob {
    asset_id: Uuid,
    original_image_url: String,
    garment_image_urls: Vec<String>,
}

/// Owns the try-on job state machine.
///
/// Jobs are validated and persisted here, handed to the configured
/// [`ProcessingTrigger`], and every later status change goes through
/// [`JobLifecycle::apply_transition`].
pub struct JobLifecycle {
    store: Arc<EntityStore>,
    trigger: ProcessingTrigger,
    config: Arc<AppConfig>,
}

impl JobLifecycle {
    pub fn new(store: Arc<EntityStore>, trigger: ProcessingTrigger, config: Arc<AppConfig>) -> Self {
        Self {
            store,
            trigger,
            config,
        }
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        self.trigger.mode()
    }

    /// Validate references, persist a queued job and kick off processing.
    ///
    /// Returns as soon as the job is stored; processing runs on a spawned
    /// task. A rejected request leaves nothing behind in the store.
    pub async fn create_job(self: &Arc<Self>, new_job: NewJob) -> Result<TryOnJob, JobError> {
        let resolved = self.validate(&new_job).await?;

        let job = TryOnJob::new(
            new_job.session_id,
            resolved.asset_id,
            new_job.garments,
            new_job.mode,
        );
        let request = ProcessingRequest {
            job_id: job.id,
            mode: job.mode,
            original_image_url: resolved.original_image_url,
            garment_image_urls: resolved.garment_image_urls,
        };
        self.store.insert_job(job.clone()).await;

        metrics::counter!("tryon_jobs_total").increment(1);
        tracing::info!(
            job_id = %job.id,
            session_id = %job.session_id,
            asset_id = %job.asset_id,
            garments = job.garments.len(),
            mode = %job.mode,
            "Try-on job queued"
        );

        self.trigger.invoke(Arc::clone(self), request);

        Ok(job)
    }

    /// Resolve every reference and build the processing inputs.
    async fn validate(&self, new_job: &NewJob) -> Result<ResolvedJob, JobError> {
        // A malformed id can never name a registered asset.
        let unknown_asset = || JobError::InvalidReference {
            kind: "asset",
            id: new_job.asset_id.clone(),
        };
        let asset_id = Uuid::parse_str(new_job.asset_id.trim()).map_err(|_| unknown_asset())?;
        let asset = self
            .store
            .get_asset(asset_id)
            .await
            .ok_or_else(unknown_asset)?;

        if new_job.garments.is_empty() {
            return Err(JobError::Validation(
                "at least one garment is required".to_string(),
            ));
        }

        let catalog_count = new_job
            .garments
            .iter()
            .filter(|g| matches!(g, GarmentRef::Catalog { .. }))
            .count();
        let external_count = new_job.garments.len() - catalog_count;

        if catalog_count > 0 && external_count > 0 {
            return Err(JobError::Validation(
                "catalog products and garment urls cannot be mixed".to_string(),
            ));
        }
        if catalog_count > self.config.max_catalog_items {
            return Err(JobError::Validation(format!(
                "at most {} products per try-on, got {}",
                self.config.max_catalog_items, catalog_count
            )));
        }
        if external_count > self.config.max_external_garments {
            return Err(JobError::Validation(format!(
                "at most {} garment urls per try-on, got {}",
                self.config.max_external_garments, external_count
            )));
        }

        let mut garment_image_urls = Vec::with_capacity(new_job.garments.len());
        for garment in &new_job.garments {
            match garment {
                GarmentRef::Catalog { product_id } => {
                    let item = self.store.get_catalog_item(product_id).await.ok_or_else(|| {
                        JobError::InvalidReference {
                            kind: "product",
                            id: product_id.clone(),
                        }
                    })?;
                    let image = item.primary_image().ok_or_else(|| {
                        JobError::Validation(format!("product {} has no images", item.id))
                    })?;
                    garment_image_urls.push(image.to_string());
                }
                GarmentRef::External { image_url } => {
                    validate_external_url(image_url)?;
                    garment_image_urls.push(image_url.clone());
                }
            }
        }

        Ok(ResolvedJob {
            asset_id,
            original_image_url: self.config.public_url(&asset::display_url(asset.asset.id)),
            garment_image_urls,
        })
    }

    pub async fn get_status(&self, job_id: Uuid) -> Result<JobStatusResponse, JobError> {
        self.store
            .get_job(job_id)
            .await
            .map(|job| JobStatusResponse::from(&job))
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    pub async fn list_session_jobs(&self, session_id: &str) -> Vec<JobStatusResponse> {
        self.store
            .jobs_for_session(session_id)
            .await
            .iter()
            .map(JobStatusResponse::from)
            .collect()
    }

    /// The only way job status changes.
    ///
    /// The terminal check and the write happen under the job's own lock, so
    /// when two completions race exactly one is applied and the other comes
    /// back as [`JobError::AlreadyTerminal`]. Returns the job after the
    /// update.
    pub async fn apply_transition(
        &self,
        job_id: Uuid,
        transition: Transition,
    ) -> Result<TryOnJob, JobError> {
        let target = transition.status;
        let outcome = self
            .store
            .update_job(job_id, |job| {
                job.apply(transition).map(|previous| (previous, job.clone()))
            })
            .await
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        match outcome {
            Ok((previous, job)) => {
                tracing::info!(
                    job_id = %job_id,
                    from = %previous,
                    to = %job.status,
                    "Job status updated"
                );
                record_transition(&job);
                Ok(job)
            }
            Err(TransitionRejection::AlreadyTerminal(status)) => {
                metrics::counter!("tryon_transitions_rejected").increment(1);
                tracing::warn!(
                    job_id = %job_id,
                    status = %status,
                    requested = %target,
                    "Ignoring transition on terminal job"
                );
                Err(JobError::AlreadyTerminal { job_id, status })
            }
            Err(TransitionRejection::Invalid { from, to, reason }) => {
                metrics::counter!("tryon_transitions_rejected").increment(1);
                tracing::warn!(
                    job_id = %job_id,
                    from = %from,
                    to = %to,
                    reason,
                    "Rejected invalid job transition"
                );
                Err(JobError::InvalidTransition {
                    job_id,
                    from,
                    to,
                    reason,
                })
            }
        }
    }
}

/// Parse a job id taken from a request path. Anything that is not a UUID
/// cannot name a job, so it is reported as not found.
pub fn parse_job_id(raw: &str) -> Result<Uuid, JobError> {
    Uuid::parse_str(raw.trim()).map_err(|_| JobError::NotFound(raw.to_string()))
}

fn validate_external_url(raw: &str) -> Result<(), JobError> {
    let url = Url::parse(raw)
        .map_err(|e| JobError::Validation(format!("invalid garment url {raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(JobError::Validation(format!(
            "garment url must be http or https, got {other}"
        ))),
    }
}

fn record_transition(job: &TryOnJob) {
    match job.status {
        JobStatus::Succeeded => {
            metrics::counter!("tryon_jobs_succeeded").increment(1);
        }
        JobStatus::Failed => {
            metrics::counter!("tryon_jobs_failed").increment(1);
        }
        JobStatus::Queued | JobStatus::Processing => return,
    }
    let elapsed = (job.updated_at - job.created_at)
        .to_std()
        .unwrap_or_default()
        .as_secs_f64();
    metrics::histogram!("tryon_processing_seconds").record(elapsed);
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Unknown {kind} reference: {id}")]
    InvalidReference { kind: &'static str, id: String },

    #[error("Invalid try-on request: {0}")]
    Validation(String),

    #[error("Job {0} not found")]
    NotFound(String),

    #[error("Job {job_id} is {status}; result not ready")]
    NotReady { job_id: Uuid, status: JobStatus },

    #[error("Invalid transition for job {job_id}: {from} -> {to} ({reason})")]
    InvalidTransition {
        job_id: Uuid,
        from: JobStatus,
        to: JobStatus,
        reason: &'static str,
    },

    #[error("Job {job_id} is already {status}")]
    AlreadyTerminal { job_id: Uuid, status: JobStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::asset::Asset;
    use crate::models::catalog::CatalogItem;
    use chrono::Utc;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn test_config() -> AppConfig {
        AppConfig {
            simulated_delay_min_ms: 10,
            simulated_delay_max_ms: 20,
            ..Default::default()
        }
    }

    fn product(id: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            title: format!("Product {id}"),
            price: 2999,
            currency: "EUR".to_string(),
            images: vec![format!("https://cdn.example.com/{id}.jpg")],
            sizes: vec!["M".into()],
            category: "jackets".to_string(),
            gender: None,
            description: None,
        }
    }

    async fn setup(config: AppConfig) -> (Arc<EntityStore>, Arc<JobLifecycle>, Uuid) {
        let config = Arc::new(config);
        let store = Arc::new(EntityStore::new());
        for id in ["p1", "p2", "p3", "p4"] {
            store.put_catalog_item(product(id)).await;
        }
        let asset = Asset {
            id: Uuid::new_v4(),
            filename: "me.jpg".to_string(),
            storage_key: "uploads/me.jpg".to_string(),
            size_bytes: 4,
            content_type: "image/jpeg".to_string(),
            created_at: Utc::now(),
        };
        let asset_id = asset.id;
        store.put_asset(asset, vec![0xFF, 0xD8, 0xFF, 0xE0]).await;

        let trigger = ProcessingTrigger::from_config(&config).unwrap();
        let lifecycle = Arc::new(JobLifecycle::new(store.clone(), trigger, config));
        (store, lifecycle, asset_id)
    }

    fn catalog_job(asset_id: Uuid, ids: &[&str]) -> NewJob {
        NewJob {
            session_id: "session-a".to_string(),
            asset_id: asset_id.to_string(),
            garments: ids
                .iter()
                .map(|id| GarmentRef::Catalog {
                    product_id: id.to_string(),
                })
                .collect(),
            mode: TryOnMode::Image,
        }
    }

    /// Insert a job directly so no trigger runs against it.
    async fn parked_job(store: &EntityStore, asset_id: Uuid) -> Uuid {
        let job = TryOnJob::new(
            "session-a".into(),
            asset_id,
            vec![GarmentRef::Catalog {
                product_id: "p1".into(),
            }],
            TryOnMode::Image,
        );
        let id = job.id;
        store.insert_job(job).await;
        id
    }

    #[tokio::test]
    async fn test_unknown_asset_is_invalid_reference_and_not_persisted() {
        let (store, lifecycle, _) = setup(test_config()).await;
        let missing = Uuid::new_v4();

        let err = lifecycle
            .create_job(catalog_job(missing, &["p1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidReference { kind: "asset", .. }));
        assert!(store.jobs_for_session("session-a").await.is_empty());
    }

    #[tokio::test]
    async fn test_too_many_products_rejected_before_persist() {
        let (store, lifecycle, asset_id) = setup(test_config()).await;

        let err = lifecycle
            .create_job(catalog_job(asset_id, &["p1", "p2", "p3", "p4"]))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));
        assert!(store.jobs_for_session("session-a").await.is_empty());
    }

    #[tokio::test]
    async fn test_first_unresolved_product_is_named() {
        let (store, lifecycle, asset_id) = setup(test_config()).await;

        let err = lifecycle
            .create_job(catalog_job(asset_id, &["p1", "nope-1", "nope-2"]))
            .await
            .unwrap_err();
        match err {
            JobError::InvalidReference { kind, id } => {
                assert_eq!(kind, "product");
                assert_eq!(id, "nope-1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.jobs_for_session("session-a").await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_garments_rejected() {
        let (_, lifecycle, asset_id) = setup(test_config()).await;
        let err = lifecycle
            .create_job(catalog_job(asset_id, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));
    }

    #[tokio::test]
    async fn test_external_url_flow_limits() {
        let (_, lifecycle, asset_id) = setup(test_config()).await;
        let url = |u: &str| GarmentRef::External {
            image_url: u.to_string(),
        };

        let two_urls = NewJob {
            garments: vec![url("https://a.example/1.jpg"), url("https://a.example/2.jpg")],
            ..catalog_job(asset_id, &[])
        };
        assert!(matches!(
            lifecycle.create_job(two_urls).await,
            Err(JobError::Validation(_))
        ));

        let bad_scheme = NewJob {
            garments: vec![url("ftp://a.example/1.jpg")],
            ..catalog_job(asset_id, &[])
        };
        assert!(matches!(
            lifecycle.create_job(bad_scheme).await,
            Err(JobError::Validation(_))
        ));

        let mixed = NewJob {
            garments: vec![
                GarmentRef::Catalog {
                    product_id: "p1".into(),
                },
                url("https://a.example/1.jpg"),
            ],
            ..catalog_job(asset_id, &[])
        };
        assert!(matches!(
            lifecycle.create_job(mixed).await,
            Err(JobError::Validation(_))
        ));

        let ok = NewJob {
            garments: vec![url("https://a.example/1.jpg")],
            ..catalog_job(asset_id, &[])
        };
        let job = assert_ok!(lifecycle.create_job(ok).await);
        assert_eq!(job.external_urls().count(), 1);
    }

    #[tokio::test]
    async fn test_create_returns_queued_job_and_status_is_readable() {
        let (_, lifecycle, asset_id) = setup(test_config()).await;

        let job = assert_ok!(lifecycle.create_job(catalog_job(asset_id, &["p1", "p2"])).await);
        assert_eq!(job.status, JobStatus::Queued);

        let status = assert_ok!(lifecycle.get_status(job.id).await);
        assert_eq!(status.job_id, job.id);
        assert_ne!(status.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_simulated_job_reaches_succeeded() {
        let (_, lifecycle, asset_id) = setup(test_config()).await;
        let job = lifecycle
            .create_job(catalog_job(asset_id, &["p1"]))
            .await
            .unwrap();

        let mut status = lifecycle.get_status(job.id).await.unwrap();
        for _ in 0..200 {
            if status.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            status = lifecycle.get_status(job.id).await.unwrap();
        }
        assert_eq!(status.status, JobStatus::Succeeded);
        assert_eq!(
            status.result_urls,
            vec![AppConfig::default().simulated_result_url]
        );
    }

    #[tokio::test]
    async fn test_get_status_unknown_job() {
        let (_, lifecycle, _) = setup(test_config()).await;
        let id = Uuid::new_v4();
        assert!(matches!(
            lifecycle.get_status(id).await,
            Err(JobError::NotFound(missing)) if missing == id.to_string()
        ));
    }

    #[test]
    fn test_parse_job_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_job_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_job_id("not-a-uuid"),
            Err(JobError::NotFound(raw)) if raw == "not-a-uuid"
        ));
    }

    #[tokio::test]
    async fn test_malformed_asset_id_is_invalid_reference() {
        let (store, lifecycle, _) = setup(test_config()).await;
        let new_job = NewJob {
            asset_id: "never-registered".to_string(),
            ..catalog_job(Uuid::new_v4(), &["p1"])
        };

        let err = assert_err!(lifecycle.create_job(new_job).await);
        assert!(matches!(
            err,
            JobError::InvalidReference { kind: "asset", ref id } if id == "never-registered"
        ));
        assert!(store.jobs_for_session("session-a").await.is_empty());
    }

    #[tokio::test]
    async fn test_transition_unknown_job_is_not_found() {
        let (_, lifecycle, _) = setup(test_config()).await;
        let err = lifecycle
            .apply_transition(Uuid::new_v4(), Transition::processing())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_terminal_is_absorbing() {
        let (store, lifecycle, asset_id) = setup(test_config()).await;
        let id = parked_job(&store, asset_id).await;

        assert_ok!(lifecycle.apply_transition(id, Transition::failed("boom")).await);
        let late = lifecycle
            .apply_transition(id, Transition::succeeded(vec!["https://out/1.jpg".into()]))
            .await;
        assert!(matches!(
            late,
            Err(JobError::AlreadyTerminal {
                status: JobStatus::Failed,
                ..
            })
        ));

        let status = lifecycle.get_status(id).await.unwrap();
        assert_eq!(status.status, JobStatus::Failed);
        assert!(status.result_urls.is_empty());
        assert_eq!(status.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_succeeded_without_results_is_invalid() {
        let (store, lifecycle, asset_id) = setup(test_config()).await;
        let id = parked_job(&store, asset_id).await;

        let err = assert_err!(
            lifecycle
                .apply_transition(id, Transition::succeeded(Vec::new()))
                .await
        );
        assert!(matches!(err, JobError::InvalidTransition { .. }));
        assert_eq!(
            lifecycle.get_status(id).await.unwrap().status,
            JobStatus::Queued
        );
    }

    #[tokio::test]
    async fn test_backward_transition_is_invalid() {
        let (store, lifecycle, asset_id) = setup(test_config()).await;
        let id = parked_job(&store, asset_id).await;

        assert_ok!(lifecycle.apply_transition(id, Transition::processing()).await);
        let back = Transition {
            status: JobStatus::Queued,
            result_urls: Vec::new(),
            error: None,
        };
        let err = assert_err!(lifecycle.apply_transition(id, back).await);
        assert!(matches!(
            err,
            JobError::InvalidTransition {
                from: JobStatus::Processing,
                to: JobStatus::Queued,
                ..
            }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_completions_apply_exactly_once() {
        let (store, lifecycle, asset_id) = setup(test_config()).await;

        for _ in 0..25 {
            let id = parked_job(&store, asset_id).await;
            assert_ok!(lifecycle.apply_transition(id, Transition::processing()).await);

            let a = {
                let lifecycle = lifecycle.clone();
                tokio::spawn(async move {
                    lifecycle
                        .apply_transition(id, Transition::succeeded(vec!["https://out/a.jpg".into()]))
                        .await
                })
            };
            let b = {
                let lifecycle = lifecycle.clone();
                tokio::spawn(async move {
                    lifecycle
                        .apply_transition(id, Transition::failed("worker crashed"))
                        .await
                })
            };
            let results = futures::future::join_all([a, b]).await;
            let results: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();

            let applied = results.iter().filter(|r| r.is_ok()).count();
            let rejected = results
                .iter()
                .filter(|r| matches!(r, Err(JobError::AlreadyTerminal { .. })))
                .count();
            assert_eq!(applied, 1);
            assert_eq!(rejected, 1);

            let status = lifecycle.get_status(id).await.unwrap();
            assert!(status.status.is_terminal());
            assert_eq!(
                !status.result_urls.is_empty(),
                status.status == JobStatus::Succeeded
            );
        }
    }

    #[tokio::test]
    async fn test_session_listing() {
        let (_, lifecycle, asset_id) = setup(test_config()).await;
        lifecycle
            .create_job(catalog_job(asset_id, &["p1"]))
            .await
            .unwrap();
        let other = NewJob {
            session_id: "session-b".into(),
            ..catalog_job(asset_id, &["p2"])
        };
        lifecycle.create_job(other).await.unwrap();

        assert_eq!(lifecycle.list_session_jobs("session-a").await.len(), 1);
        assert_eq!(lifecycle.list_session_jobs("session-b").await.len(), 1);
        assert!(lifecycle.list_session_jobs("session-c").await.is_empty());
    }
}
