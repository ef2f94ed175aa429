use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::asset::UploadResponse;
use crate::services::assets::AssetError;

/// POST /api/v1/uploads: Upload a user photo (multipart field `photo`).
pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("photo") {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        let asset = state
            .assets
            .register(filename.as_deref(), content_type.as_deref(), data)
            .await?;

        return Ok(Json(UploadResponse {
            asset_id: asset.id,
            url: asset.display_url(),
            filename: asset.filename,
            size: asset.size_bytes,
        }));
    }

    Err(AppError::Asset(AssetError::Empty))
}

/// GET /api/v1/uploads/{asset_id}: Serve the uploaded bytes.
pub async fn get_upload(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> AppResult<Response> {
    let stored = state.assets.fetch(&asset_id).await?;
    Ok(([(header::CONTENT_TYPE, stored.asset.content_type)], stored.data).into_response())
}
