//! Money types built on decimal arithmetic.
//!
//! All monetary amounts in Meridian are `rust_decimal::Decimal` values in the
//! currency's standard unit (e.g. dollars, not cents). Floating point is never
//! used for money.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes supported by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// The ISO 4217 code as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(format!("unsupported currency code: {s}")),
        }
    }
}

/// The monetary components of an order, fixed at assembly time.
///
/// An order's grand total is derived from these components exactly once, when
/// the order is assembled from a cart. The components are persisted alongside
/// the total so the arithmetic is auditable; the total is never recomputed
/// from live data afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderTotals {
    /// Sum of `unit_price * quantity` over all order items.
    pub subtotal: Decimal,
    /// Shipping method price snapshot.
    pub shipping_cost: Decimal,
    /// Payment method fee snapshot.
    pub payment_fee: Decimal,
    /// Tax charged on the order.
    pub tax_amount: Decimal,
    /// Discount applied to the order.
    pub discount_amount: Decimal,
}

impl OrderTotals {
    /// The order grand total:
    /// `subtotal + shipping_cost + payment_fee + tax_amount - discount_amount`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.subtotal + self.shipping_cost + self.payment_fee + self.tax_amount
            - self.discount_amount
    }
}
