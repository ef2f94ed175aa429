use axum::body::Bytes;
use chrono::Utc;
use image::ImageFormat;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::asset::Asset;
use crate::store::{EntityStore, StoredAsset};

/// Registers and serves uploaded user photos.
pub struct AssetService {
    store: Arc<EntityStore>,
    max_bytes: usize,
}

impl AssetService {
    pub fn new(store: Arc<EntityStore>, max_bytes: usize) -> Self {
        Self { store, max_bytes }
    }

    /// Validate and store an upload.
    ///
    /// The declared content type must be `image/*` and the bytes must sniff
    /// as a known image format. The stored content type is the sniffed one.
    pub async fn register(
        &self,
        filename: Option<&str>,
        declared_type: Option<&str>,
        data: impl Into<Bytes>,
    ) -> Result<Asset, AssetError> {
        let data: Bytes = data.into();
        if data.is_empty() {
            return Err(AssetError::Empty);
        }
        if data.len() > self.max_bytes {
            return Err(AssetError::PayloadTooLarge {
                size: data.len(),
                limit: self.max_bytes,
            });
        }

        let declared = declared_type.unwrap_or("application/octet-stream");
        if !declared.starts_with("image/") {
            return Err(AssetError::UnsupportedType(declared.to_string()));
        }
        let format = image::guess_format(&data)
            .map_err(|_| AssetError::UnsupportedType(declared.to_string()))?;

        let id = Uuid::new_v4();
        let asset = Asset {
            id,
            filename: filename
                .filter(|f| !f.is_empty())
                .unwrap_or("upload")
                .to_string(),
            storage_key: format!("uploads/{}.{}", id, extension(format)),
            size_bytes: data.len() as u64,
            content_type: format.to_mime_type().to_string(),
            created_at: Utc::now(),
        };

        self.store.put_asset(asset.clone(), data).await;
        metrics::counter!("tryon_assets_total").increment(1);
        tracing::info!(
            asset_id = %asset.id,
            size_bytes = asset.size_bytes,
            content_type = %asset.content_type,
            "Asset registered"
        );

        Ok(asset)
    }

    /// Look up an asset by the id taken from a request path.
    pub async fn fetch(&self, raw_id: &str) -> Result<StoredAsset, AssetError> {
        let not_found = || AssetError::NotFound(raw_id.to_string());
        let id = Uuid::parse_str(raw_id.trim()).map_err(|_| not_found())?;
        self.store.get_asset(id).await.ok_or_else(not_found)
    }
}

fn extension(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("bin")
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("No file uploaded")]
    Empty,

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("Asset {0} not found")]
    NotFound(String),
}
