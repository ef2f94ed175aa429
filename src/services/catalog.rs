use serde::Deserialize;
use std::path::Path;

use crate::models::catalog::CatalogItem;
use crate::store::EntityStore;

#[derive(Deserialize)]
struct CatalogFile {
    products: Vec<CatalogItem>,
}

/// Read the product catalog from a JSON file of the form
/// `{ "products": [ ... ] }`.
pub async fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<CatalogItem>, CatalogError> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_catalog(&raw)
}

pub fn parse_catalog(raw: &str) -> Result<Vec<CatalogItem>, CatalogError> {
    let file: CatalogFile = serde_json::from_str(raw)?;
    Ok(file
        .products
        .into_iter()
        .map(|mut item| {
            let mut seen = std::collections::HashSet::new();
            item.sizes.retain(|s| seen.insert(s.clone()));
            item
        })
        .collect())
}

/// Load catalog items into the store, preserving file order.
pub async fn seed(store: &EntityStore, items: Vec<CatalogItem>) -> usize {
    let count = items.len();
    for item in items {
        store.put_catalog_item(item).await;
    }
    count
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}
