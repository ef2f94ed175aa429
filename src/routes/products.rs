use axum::extract::{Path, Query, State};
use axum::Json;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::catalog::{CatalogFilter, CatalogItem, CatalogListResponse};

/// GET /api/v1/products: List catalog items, optionally filtered by
/// `category`, `gender` and `search`.
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<CatalogFilter>,
) -> Json<CatalogListResponse> {
    let items = state.store.filter_catalog(&filter).await;
    Json(CatalogListResponse { items })
}

/// GET /api/v1/products/{product_id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> AppResult<Json<CatalogItem>> {
    state
        .store
        .get_catalog_item(&product_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Product {product_id} not found")))
}
