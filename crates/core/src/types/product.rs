//! Catalog product snapshot.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Price, ProductId, StockStatus};

/// A product as returned by the catalog API.
///
/// Carts and wishlists keep a copy of this snapshot, so fields the storefront
/// does not model are preserved in `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_status: Option<StockStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Create a product with only the required fields set.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, price: Price) -> Self {
        Self {
            id,
            name: name.into(),
            slug: String::new(),
            price,
            compare_price: None,
            primary_image: None,
            stock_status: None,
            extra: Map::new(),
        }
    }

    /// Set the URL slug.
    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    /// Set the primary image URL.
    #[must_use]
    pub fn with_primary_image(mut self, url: impl Into<String>) -> Self {
        self.primary_image = Some(url.into());
        self
    }

    /// Best available image URL.
    ///
    /// Falls back to the first entry of the gallery (`images`), which the
    /// backend sends either as plain strings or as `{ "image": url }` objects.
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        if let Some(url) = self.primary_image.as_deref() {
            return Some(url);
        }
        match self.extra.get("images")?.as_array()?.first()? {
            Value::String(url) => Some(url),
            Value::Object(image) => image.get("image")?.as_str(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_payload() {
        let json = r#"{
            "id": 7,
            "name": "Saree A",
            "slug": "saree-a",
            "price": "2499.00",
            "compare_price": null,
            "stock_status": "in_stock",
            "category": {"id": 2, "name": "Sarees"}
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(7));
        assert_eq!(product.price, Price::from_units(2499));
        assert_eq!(product.compare_price, None);
        assert_eq!(product.stock_status, Some(StockStatus::InStock));
        assert!(product.extra.contains_key("category"));
    }

    #[test]
    fn test_unknown_fields_survive_reserialization() {
        let json = r#"{"id": 1, "name": "Kurta", "price": 999, "fabric": "cotton"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        let back = serde_json::to_value(&product).unwrap();
        assert_eq!(back["fabric"], "cotton");
    }

    #[test]
    fn test_image_url_fallbacks() {
        let product = Product::new(ProductId::new(1), "A", Price::from_units(1))
            .with_primary_image("/a.jpg");
        assert_eq!(product.image_url(), Some("/a.jpg"));

        let json = r#"{"id": 2, "name": "B", "price": 1, "images": [{"image": "/b.jpg"}]}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.image_url(), Some("/b.jpg"));

        let json = r#"{"id": 3, "name": "C", "price": 1, "images": ["/c.jpg"]}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.image_url(), Some("/c.jpg"));

        let product = Product::new(ProductId::new(4), "D", Price::from_units(1));
        assert_eq!(product.image_url(), None);
    }
}
