//! Article data as consumed by the checkout core.
//!
//! Articles are owned by the catalog; the checkout core reads them and, at
//! order assembly, decrements their stock. Nothing here edits name, price, or
//! flags.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use meridian_core::ArticleId;

/// A purchasable catalog article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub sku: String,
    pub name: String,
    /// Price including tax, snapshotted onto cart items at add time.
    pub gross_price: Decimal,
    /// Units on hand. Meaningless when `ignore_stock` is set.
    pub stock: u32,
    /// Bypass all stock checks (services, digital goods).
    pub ignore_stock: bool,
    /// Inactive articles cannot be added to carts.
    pub active: bool,
}
