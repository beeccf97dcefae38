//! Payment and shipping method models.
//!
//! Orders snapshot the id, type, and fee/price of the methods chosen at
//! assembly time, so editing or retiring a method never rewrites history.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use meridian_core::{PaymentMethodId, PaymentMethodType, ShippingMethodId};

/// A configured way to pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub name: String,
    pub method_type: PaymentMethodType,
    pub description: String,
    /// Surcharge added to the order total when this method is chosen.
    pub fee: Decimal,
    pub active: bool,
}

/// A configured way to ship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: ShippingMethodId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    /// Human-readable delivery estimate, e.g. "2-4 business days".
    pub delivery_time: String,
    pub active: bool,
}
