//! Order and order item models.
//!
//! An order is the durable record created from a cart at checkout time. All
//! customer, method, and article data is copied onto the order when it is
//! assembled; later edits to the source rows never alter it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use meridian_core::{
    ArticleId, CurrencyCode, Email, InvalidTransition, OrderId, OrderItemId, OrderStatus,
    OrderTotals, PaymentMethodId, PaymentMethodType, ShippingMethodId,
};

/// A postal address snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// A persisted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Unique, immutable once assigned.
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_method_id: PaymentMethodId,
    pub payment_method_type: PaymentMethodType,
    pub shipping_method_id: ShippingMethodId,
    pub email: Email,
    pub customer_name: String,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub currency: CurrencyCode,
    /// Monetary components, fixed at assembly.
    pub totals: OrderTotals,
    /// Grand total, computed once from `totals` at assembly.
    pub total: Decimal,
    /// Provider transaction reference, set on successful payment.
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Advance the order to `to`, stamping the matching timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if the move is not legal; the order is
    /// left unchanged in that case.
    pub fn transition_to(
        &mut self,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.status = self.status.transition_to(to)?;
        match to {
            OrderStatus::PaymentReceived => self.paid_at = Some(now),
            OrderStatus::Shipped => self.shipped_at = Some(now),
            OrderStatus::Delivered => self.delivered_at = Some(now),
            OrderStatus::Cancelled => self.cancelled_at = Some(now),
            OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Failed => {}
        }
        Ok(())
    }
}

/// One purchased line, denormalized at purchase time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub article_id: ArticleId,
    pub sku: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

/// An order ready to be persisted, before an id is assigned.
///
/// Built by the order assembler; the store persists it atomically together
/// with the stock re-check and decrement.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub payment_method_id: PaymentMethodId,
    pub payment_method_type: PaymentMethodType,
    pub shipping_method_id: ShippingMethodId,
    pub email: Email,
    pub customer_name: String,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub currency: CurrencyCode,
    pub totals: OrderTotals,
    pub total: Decimal,
    pub items: Vec<NewOrderItem>,
}

/// One line of a [`NewOrder`].
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub article_id: ArticleId,
    pub sku: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order {
            id: OrderId::new(1),
            order_number: "ORD-20250101-TEST01".to_owned(),
            status: OrderStatus::Pending,
            payment_method_id: PaymentMethodId::new(1),
            payment_method_type: PaymentMethodType::Prepayment,
            shipping_method_id: ShippingMethodId::new(1),
            email: Email::parse("shopper@example.com").expect("valid"),
            customer_name: "Test Shopper".to_owned(),
            shipping_address: address(),
            billing_address: address(),
            currency: CurrencyCode::USD,
            totals: OrderTotals {
                subtotal: dec!(25.00),
                shipping_cost: dec!(4.99),
                ..OrderTotals::default()
            },
            total: dec!(29.99),
            transaction_id: None,
            created_at: Utc::now(),
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    fn address() -> Address {
        Address {
            line1: "1 Main St".to_owned(),
            line2: None,
            city: "Springfield".to_owned(),
            postal_code: "12345".to_owned(),
            country: "US".to_owned(),
        }
    }

    #[test]
    fn test_transition_stamps_paid_at() {
        let mut order = order();
        let now = Utc::now();
        order
            .transition_to(OrderStatus::PaymentReceived, now)
            .expect("legal");
        assert_eq!(order.status, OrderStatus::PaymentReceived);
        assert_eq!(order.paid_at, Some(now));
        assert_eq!(order.shipped_at, None);
    }

    #[test]
    fn test_illegal_transition_leaves_order_unchanged() {
        let mut order = order();
        order
            .transition_to(OrderStatus::Failed, Utc::now())
            .expect("legal");
        let err = order
            .transition_to(OrderStatus::PaymentReceived, Utc::now())
            .expect_err("failed is terminal");
        assert_eq!(err.from, OrderStatus::Failed);
        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(order.paid_at, None);
    }
}
