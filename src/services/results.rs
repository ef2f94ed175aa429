use std::sync::Arc;
use uuid::Uuid;

use crate::models::asset;
use crate::models::job::JobStatus;
use crate::models::tryon::TryOnResult;
use crate::services::lifecycle::JobError;
use crate::store::EntityStore;

/// Builds the client-facing payload for a succeeded job.
pub struct ResultAssembler {
    store: Arc<EntityStore>,
}

impl ResultAssembler {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Catalog entries that no longer resolve are left out rather than
    /// failing the whole result.
    pub async fn get_result(&self, job_id: Uuid) -> Result<TryOnResult, JobError> {
        let job = self
            .store
            .get_job(job_id)
            .await
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        if job.status != JobStatus::Succeeded {
            return Err(JobError::NotReady {
                job_id,
                status: job.status,
            });
        }

        let mut products = Vec::new();
        for product_id in job.product_ids() {
            match self.store.get_catalog_item(product_id).await {
                Some(item) => products.push(item),
                None => {
                    tracing::warn!(job_id = %job_id, product_id, "Catalog item no longer available");
                }
            }
        }

        Ok(TryOnResult {
            job_id,
            original_url: asset::display_url(job.asset_id),
            result_urls: job.result_urls.clone(),
            products,
            external_garment_urls: job.external_urls().map(str::to_string).collect(),
            created_at: job.created_at,
        })
    }
}
