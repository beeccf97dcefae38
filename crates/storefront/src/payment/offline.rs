//! Offline payment strategies.
//!
//! These settle without an external provider call: the order is accepted
//! immediately and the shopper gets instructions for completing payment out
//! of band.

use async_trait::async_trait;

use meridian_core::PaymentMethodType;

use crate::models::Order;

use super::{PaymentData, PaymentOutcome, PaymentStrategy};

/// Bank transfer in advance.
pub struct PrepaymentStrategy;

#[async_trait]
impl PaymentStrategy for PrepaymentStrategy {
    fn method_type(&self) -> PaymentMethodType {
        PaymentMethodType::Prepayment
    }

    async fn process(&self, order: &Order, _data: &PaymentData) -> PaymentOutcome {
        PaymentOutcome::approved("order accepted, awaiting bank transfer").with_instructions(
            format!(
                "Please transfer {} {} and reference order {}. \
                 Your order ships once the funds arrive.",
                order.total, order.currency, order.order_number
            ),
        )
    }
}

/// Payment on pickup at a physical store.
pub struct PayAtStoreStrategy;

#[async_trait]
impl PaymentStrategy for PayAtStoreStrategy {
    fn method_type(&self) -> PaymentMethodType {
        PaymentMethodType::PayAtStore
    }

    async fn process(&self, order: &Order, _data: &PaymentData) -> PaymentOutcome {
        PaymentOutcome::approved("order accepted, pay at pickup").with_instructions(format!(
            "Your order {} is reserved. Pay {} {} when you pick it up.",
            order.order_number, order.total, order.currency
        ))
    }
}
