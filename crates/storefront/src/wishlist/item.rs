//! Wishlist entry types.

use chrono::{DateTime, Utc};
use ebasi_core::{Product, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a wishlist entry.
///
/// Server entries carry the backend's integer id. Guest entries get a random
/// UUID. Older guest snapshots used a millisecond timestamp, which still loads
/// as `Numeric`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WishlistItemId {
    Numeric(i64),
    Local(Uuid),
}

impl WishlistItemId {
    /// A fresh client-side id.
    #[must_use]
    pub fn local() -> Self {
        Self::Local(Uuid::new_v4())
    }
}

/// A saved product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub product: Product,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

impl WishlistItem {
    /// A new client-side entry for `product`, stamped now.
    #[must_use]
    pub fn local(product: &Product) -> Self {
        Self {
            id: WishlistItemId::local(),
            product: product.clone(),
            product_id: product.id,
            created_at: Utc::now(),
        }
    }
}

/// What a wishlist mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistChange {
    Added,
    Removed,
    /// The requested state already held; nothing was sent or written.
    Unchanged,
}

/// Loading phase of a wishlist store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}
