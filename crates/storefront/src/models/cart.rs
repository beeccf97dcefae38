//! Cart and cart item models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use meridian_core::{ArticleId, CartId, CartItemId, CurrencyCode, UserId, VariantId};

/// A shopper's in-progress, unpurchased collection of line items.
///
/// A cart is discoverable through exactly one of: the cart-id pointer in the
/// session, the owning user, or the anonymous session identity. It is created
/// lazily on first mutation and deleted only on confirmed payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    /// Anonymous visitor token that owned the cart at creation. Unique.
    pub session_identity: String,
    /// Authenticated owner, if the shopper was logged in.
    pub user_id: Option<UserId>,
    pub currency: CurrencyCode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line in a cart.
///
/// At most one item exists per `(cart, article, variant)`; repeated adds
/// increment `quantity`. `unit_price` is snapshotted from the article's gross
/// price when the line is first created and never re-priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub article_id: ArticleId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// Line total: `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Aggregates over a cart's items, computed on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub item_count: u32,
}

impl CartTotals {
    /// Compute totals over a slice of cart items.
    #[must_use]
    pub fn of(items: &[CartItem]) -> Self {
        Self {
            subtotal: items.iter().map(CartItem::line_total).sum(),
            item_count: items.iter().map(|i| i.quantity).sum(),
        }
    }
}
