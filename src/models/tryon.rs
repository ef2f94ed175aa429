use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::catalog::CatalogItem;
use crate::models::job::{JobStatus, TryOnJob, TryOnMode};

/// Request to start a try-on job.
///
/// Either `product_ids` (catalog flow) or `garment_url` (direct-URL flow)
/// must be given, not both. Cardinality limits are enforced by the
/// lifecycle manager from configuration.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTryOnRequest {
    /// Checked against registered uploads by the lifecycle manager, so a
    /// malformed id reports the same error as an unknown one.
    #[garde(length(min = 1, max = 64))]
    pub user_asset_id: String,

    #[serde(default)]
    #[garde(inner(length(min = 1, max = 128)))]
    pub product_ids: Vec<String>,

    #[serde(default)]
    #[garde(length(min = 1, max = 2048))]
    pub garment_url: Option<String>,

    #[serde(default)]
    #[garde(skip)]
    pub mode: TryOnMode,
}

/// Response after creating a try-on job.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTryOnResponse {
    pub job_id: Uuid,
    pub session_id: String,
    pub status: JobStatus,
}

/// Polling view of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub result_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&TryOnJob> for JobStatusResponse {
    fn from(job: &TryOnJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            result_urls: job.result_urls.clone(),
            error: job.error.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Jobs belonging to one session.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobListResponse {
    pub items: Vec<JobStatusResponse>,
}

/// Client-facing result of a succeeded job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryOnResult {
    pub job_id: Uuid,
    pub original_url: String,
    pub result_urls: Vec<String>,
    pub products: Vec<CatalogItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_garment_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}
