//! Test fixtures: a small garment catalog and image payloads

use tryon_service::models::catalog::CatalogItem;

/// Catalog fixture describing one garment
#[derive(Debug, Clone)]
pub struct ProductFixture {
    pub id: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub gender: Option<&'static str>,
    pub description: Option<&'static str>,
}

pub const TEST_PRODUCTS: &[ProductFixture] = &[
    ProductFixture {
        id: "jk-100",
        title: "Cropped Puffer Jacket",
        category: "jackets",
        gender: Some("women"),
        description: Some("Water-repellent shell"),
    },
    ProductFixture {
        id: "dr-200",
        title: "Satin Slip Dress",
        category: "dresses",
        gender: Some("women"),
        description: None,
    },
    ProductFixture {
        id: "jk-101",
        title: "Denim Trucker Jacket",
        category: "jackets",
        gender: Some("men"),
        description: Some("Rigid cotton denim"),
    },
    ProductFixture {
        id: "tp-300",
        title: "Oversized Tee",
        category: "tops",
        gender: None,
        description: Some("Layer it under a jacket"),
    },
];

impl ProductFixture {
    pub fn to_item(&self) -> CatalogItem {
        CatalogItem {
            id: self.id.to_string(),
            title: self.title.to_string(),
            price: 5995,
            currency: "EUR".to_string(),
            images: vec![format!("https://cdn.example.com/products/{}.jpg", self.id)],
            sizes: vec!["S".to_string(), "M".to_string(), "L".to_string()],
            category: self.category.to_string(),
            gender: self.gender.map(str::to_string),
            description: self.description.map(str::to_string),
        }
    }
}

/// Bytes that sniff as a PNG, padded to `len`.
pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.resize(len.max(8), 0);
    data
}

/// Bytes that sniff as a JPEG, padded to `len`.
pub fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.resize(len.max(4), 0);
    data
}
