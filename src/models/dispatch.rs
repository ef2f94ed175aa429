use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{JobStatus, TryOnMode};

/// Work order sent to an external compositor in delegated mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchPayload {
    pub job_id: Uuid,
    pub mode: TryOnMode,
    pub original_image_url: String,
    pub garment_image_urls: Vec<String>,
    pub callback_url: String,
}

/// Completion report posted back by the compositor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReport {
    pub status: JobStatus,
    #[serde(default)]
    pub result_urls: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Acknowledgement returned to the compositor.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionAck {
    pub job_id: Uuid,
    pub status: JobStatus,
    /// False when the job was already terminal and the report was ignored.
    pub applied: bool,
}
