use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::job::GarmentRef;
use crate::models::tryon::{CreateTryOnRequest, CreateTryOnResponse};
use crate::routes::session_from_headers;
use crate::services::lifecycle::NewJob;

/// POST /api/v1/tryon: Start a try-on job for an uploaded photo.
///
/// The session key comes from `x-session-id`; a fresh one is issued when
/// the header is missing and returned in the response.
pub async fn create_tryon(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateTryOnRequest>,
) -> AppResult<Json<CreateTryOnResponse>> {
    request.validate()?;

    let garments = match (request.product_ids.is_empty(), request.garment_url) {
        (false, None) => request
            .product_ids
            .into_iter()
            .map(|product_id| GarmentRef::Catalog { product_id })
            .collect(),
        (true, Some(image_url)) => vec![GarmentRef::External { image_url }],
        (true, None) => {
            return Err(AppError::BadRequest(
                "product_ids or garment_url is required".to_string(),
            ))
        }
        (false, Some(_)) => {
            return Err(AppError::BadRequest(
                "send either product_ids or garment_url, not both".to_string(),
            ))
        }
    };

    let session_id =
        session_from_headers(&headers).unwrap_or_else(|| Uuid::new_v4().to_string());

    let job = state
        .lifecycle
        .create_job(NewJob {
            session_id,
            asset_id: request.user_asset_id,
            garments,
            mode: request.mode,
        })
        .await?;

    Ok(Json(CreateTryOnResponse {
        job_id: job.id,
        session_id: job.session_id,
        status: job.status,
    }))
}
