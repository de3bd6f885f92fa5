//! Status enums reported by the catalog backend.

use serde::{Deserialize, Serialize};

/// Product availability as reported by the backend.
///
/// Unrecognized values deserialize to [`StockStatus::Unknown`] so a new
/// backend status never breaks a stored wishlist snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
    PreOrder,
    #[default]
    #[serde(other)]
    Unknown,
}

impl StockStatus {
    /// Whether the product can currently be added to a cart.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        matches!(self, Self::InStock | Self::LowStock | Self::PreOrder)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        let status: StockStatus = serde_json::from_str("\"in_stock\"").unwrap();
        assert_eq!(status, StockStatus::InStock);
        assert!(status.is_purchasable());
    }

    #[test]
    fn test_unknown_value_falls_back() {
        let status: StockStatus = serde_json::from_str("\"discontinued\"").unwrap();
        assert_eq!(status, StockStatus::Unknown);
        assert!(!status.is_purchasable());
    }
}
