use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded user photo. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub filename: String,
    pub storage_key: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// Path the asset bytes are served from.
    pub fn display_url(&self) -> String {
        display_url(self.id)
    }
}

pub fn display_url(asset_id: Uuid) -> String {
    format!("/api/v1/uploads/{}", asset_id)
}

/// Response after registering an upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub asset_id: Uuid,
    pub url: String,
    pub filename: String,
    pub size: u64,
}
