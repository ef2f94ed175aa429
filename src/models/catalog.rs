use serde::{Deserialize, Serialize};

/// A garment from the product catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
    /// Price in minor currency units (cents).
    pub price: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// First entry is the canonical garment image.
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl CatalogItem {
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Catalog filter. `None`, empty strings and `"all"` match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    pub category: Option<String>,
    pub gender: Option<String>,
    pub search: Option<String>,
}

/// Response for catalog listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogListResponse {
    pub items: Vec<CatalogItem>,
}
