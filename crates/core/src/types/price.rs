//! Type-safe price representation using decimal arithmetic.
//!
//! The backend serializes prices as decimal strings (`"2499.00"`) but older
//! endpoints and cached snapshots may carry bare JSON numbers; both parse.

use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount in the store currency's standard unit (rupees, not paise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole number of currency units.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this price.
    ///
    /// Saturates at the largest representable amount instead of overflowing.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }

    /// Format for display, e.g. `₹2499.00`.
    #[must_use]
    pub fn display(&self, currency: CurrencyCode) -> String {
        format!("{}{:.2}", currency.symbol(), self.0)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    /// Saturating addition.
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// ISO 4217 currency codes the storefront displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_string_and_number() {
        let from_str: Price = serde_json::from_str("\"2499.00\"").unwrap();
        let from_num: Price = serde_json::from_str("2499").unwrap();
        assert_eq!(from_str, from_num);
    }

    #[test]
    fn test_times_and_sum() {
        let price = Price::new(Decimal::new(1250, 2));
        assert_eq!(price.times(3), Price::new(Decimal::new(3750, 2)));

        let total: Price = [Price::from_units(10), Price::from_units(5)].into_iter().sum();
        assert_eq!(total, Price::from_units(15));
    }

    #[test]
    fn test_arithmetic_saturates_on_overflow() {
        let huge = Price::new(Decimal::MAX);
        assert_eq!(huge.times(2), huge);
        assert_eq!(huge + Price::from_units(1), huge);

        let total: Price = [huge, huge, Price::from_units(3)].into_iter().sum();
        assert_eq!(total, huge);
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_units(2499).display(CurrencyCode::INR), "₹2499.00");
        assert_eq!(Price::new(Decimal::new(1999, 2)).display(CurrencyCode::USD), "$19.99");
    }
}
