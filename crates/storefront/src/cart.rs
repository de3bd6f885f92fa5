//! Cart store.
//!
//! The cart is entirely local: line items live in memory and are mirrored to
//! [`keys::CART`] after every mutation. Nothing here talks to the network, and
//! login/logout never touch the cart.
//!
//! Mutations write the new snapshot first and only then replace the in-memory
//! items, so a failed write (quota, I/O) leaves the store exactly as it was
//! and is reported to the caller.

use std::sync::Arc;

use ebasi_core::{Price, Product, ProductId};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::storage::{LocalStorage, StorageError, keys, load_json, save_json};

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_image: Option<String>,
    pub quantity: u32,
}

impl CartItem {
    fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            price: product.price,
            primary_image: product.image_url().map(String::from),
            quantity,
        }
    }

    /// Price of this line (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Local cart state container.
#[derive(Debug)]
pub struct CartStore {
    storage: Arc<dyn LocalStorage>,
    items: Vec<CartItem>,
}

impl CartStore {
    /// Open the cart, loading the persisted snapshot if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupt`] if the snapshot is not a valid cart,
    /// or the backend's read error.
    pub fn open(storage: Arc<dyn LocalStorage>) -> Result<Self, StorageError> {
        let items: Vec<CartItem> = load_json(storage.as_ref(), keys::CART)?.unwrap_or_default();
        debug!(lines = items.len(), "Cart loaded");
        Ok(Self { storage, items })
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines (badge count).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Add `quantity` units of `product`.
    ///
    /// A product already in the cart has its quantity increased by `quantity`;
    /// otherwise a new line is appended. A quantity of 0 is treated as 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the new snapshot cannot be persisted; the cart is
    /// left unchanged in that case.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_to_cart(&mut self, product: &Product, quantity: u32) -> Result<(), StorageError> {
        let quantity = quantity.max(1);
        let mut next = self.items.clone();
        match next.iter_mut().find(|item| item.id == product.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
            None => next.push(CartItem::from_product(product, quantity)),
        }
        self.commit(next)
    }

    /// Set the quantity of the line for `id`.
    ///
    /// The value is stored as given, including 0; clamping is left to the
    /// caller. Returns `false` (and writes nothing) when no line matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the new snapshot cannot be persisted.
    #[instrument(skip(self))]
    pub fn update_quantity(&mut self, id: ProductId, quantity: u32) -> Result<bool, StorageError> {
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return Ok(false);
        };
        let mut next = self.items.clone();
        if let Some(item) = next.get_mut(index) {
            item.quantity = quantity;
        }
        self.commit(next)?;
        Ok(true)
    }

    /// Remove the line for `id`. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the new snapshot cannot be persisted.
    #[instrument(skip(self))]
    pub fn remove_from_cart(&mut self, id: ProductId) -> Result<bool, StorageError> {
        if !self.contains(id) {
            return Ok(false);
        }
        let next = self.items.iter().filter(|item| item.id != id).cloned().collect();
        self.commit(next)?;
        Ok(true)
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns an error if the empty snapshot cannot be persisted.
    #[instrument(skip(self))]
    pub fn clear_cart(&mut self) -> Result<(), StorageError> {
        self.commit(Vec::new())
    }

    fn commit(&mut self, next: Vec<CartItem>) -> Result<(), StorageError> {
        save_json(self.storage.as_ref(), keys::CART, &next)?;
        self.items = next;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::MemoryStorage;

    fn product(id: i64, price: i64) -> Product {
        Product::new(ProductId::new(id), format!("Product {id}"), Price::from_units(price))
            .with_slug(format!("product-{id}"))
    }

    fn open_empty() -> (Arc<MemoryStorage>, CartStore) {
        let storage = Arc::new(MemoryStorage::new());
        let cart = CartStore::open(storage.clone()).unwrap();
        (storage, cart)
    }

    #[test]
    fn test_adding_same_product_twice_merges_lines() {
        let (_, mut cart) = open_empty();
        cart.add_to_cart(&product(1, 100), 1).unwrap();
        cart.add_to_cart(&product(1, 100), 1).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_add_honours_requested_quantity() {
        // Regression: repeat adds used to bump the line by 1 whatever the
        // requested quantity was.
        let (_, mut cart) = open_empty();
        cart.add_to_cart(&product(1, 100), 2).unwrap();
        cart.add_to_cart(&product(1, 100), 3).unwrap();

        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity, 5);
    }

    #[test]
    fn test_add_zero_quantity_counts_as_one() {
        let (_, mut cart) = open_empty();
        cart.add_to_cart(&product(1, 100), 0).unwrap();
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let (storage, mut cart) = open_empty();
        cart.add_to_cart(&product(1, 100), 1).unwrap();
        let before = storage.get_item(keys::CART).unwrap();

        assert!(!cart.remove_from_cart(ProductId::new(99)).unwrap());
        assert_eq!(cart.len(), 1);
        assert_eq!(storage.get_item(keys::CART).unwrap(), before);
    }

    #[test]
    fn test_remove_present() {
        let (_, mut cart) = open_empty();
        cart.add_to_cart(&product(1, 100), 1).unwrap();
        cart.add_to_cart(&product(2, 100), 1).unwrap();

        assert!(cart.remove_from_cart(ProductId::new(1)).unwrap());
        assert!(!cart.contains(ProductId::new(1)));
        assert!(cart.contains(ProductId::new(2)));
    }

    #[test]
    fn test_clear_then_reload_is_empty() {
        let (storage, mut cart) = open_empty();
        cart.add_to_cart(&product(1, 100), 1).unwrap();
        cart.add_to_cart(&product(2, 100), 4).unwrap();
        cart.clear_cart().unwrap();

        let reloaded = CartStore::open(storage).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_add_twice_then_update_quantity() {
        let (storage, mut cart) = open_empty();
        cart.add_to_cart(&product(1, 100), 1).unwrap();
        cart.add_to_cart(&product(1, 100), 1).unwrap();
        assert!(cart.update_quantity(ProductId::new(1), 5).unwrap());

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);

        let reloaded = CartStore::open(storage).unwrap();
        assert_eq!(reloaded.items(), cart.items());
    }

    #[test]
    fn test_update_quantity_stores_zero_as_is() {
        let (_, mut cart) = open_empty();
        cart.add_to_cart(&product(1, 100), 3).unwrap();
        assert!(cart.update_quantity(ProductId::new(1), 0).unwrap());
        assert_eq!(cart.items()[0].quantity, 0);
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_update_quantity_unknown_id() {
        let (_, mut cart) = open_empty();
        assert!(!cart.update_quantity(ProductId::new(3), 2).unwrap());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals() {
        let (_, mut cart) = open_empty();
        let mut kurta = product(1, 0);
        kurta.price = Price::new(Decimal::new(99950, 2));
        cart.add_to_cart(&kurta, 2).unwrap();
        cart.add_to_cart(&product(2, 2499), 1).unwrap();

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal(), Price::new(Decimal::new(449_800, 2)));
    }

    #[test]
    fn test_persisted_format() {
        let (storage, mut cart) = open_empty();
        cart.add_to_cart(&product(7, 2499).with_primary_image("/saree.jpg"), 1)
            .unwrap();

        let raw = storage.get_item(keys::CART).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["id"], 7);
        assert_eq!(json[0]["slug"], "product-7");
        assert_eq!(json[0]["primary_image"], "/saree.jpg");
        assert_eq!(json[0]["quantity"], 1);
    }

    #[test]
    fn test_loads_snapshot_with_numeric_price() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set_item(
                keys::CART,
                r#"[{"id":1,"name":"Saree A","slug":"saree-a","price":2499,"quantity":2}]"#,
            )
            .unwrap();
        let cart = CartStore::open(storage).unwrap();
        assert_eq!(cart.subtotal(), Price::from_units(4998));
    }

    #[test]
    fn test_subtotal_of_huge_snapshot_price_does_not_panic() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set_item(
                keys::CART,
                r#"[{"id":1,"name":"X","price":"79228162514264337593543950335","quantity":2}]"#,
            )
            .unwrap();
        let cart = CartStore::open(storage).unwrap();
        assert_eq!(cart.subtotal(), Price::new(Decimal::MAX));
    }

    #[test]
    fn test_corrupt_snapshot_fails_open() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(keys::CART, "{not json").unwrap();
        assert!(matches!(
            CartStore::open(storage),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_failed_write_leaves_cart_unchanged() {
        let storage = Arc::new(MemoryStorage::with_quota(120));
        let mut cart = CartStore::open(storage).unwrap();
        cart.add_to_cart(&product(1, 100), 1).unwrap();

        let err = cart.add_to_cart(&product(2, 100), 1).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(cart.len(), 1);
        assert!(!cart.contains(ProductId::new(2)));
    }
}
