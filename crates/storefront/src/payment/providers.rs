//! Online provider strategies.
//!
//! Every online provider follows the same shape: the client side collects a
//! provider token, the strategy validates that the token field is present
//! and charges it through the provider's gateway. What differs per provider
//! is the token field name and the gateway endpoint - so one strategy type
//! serves all seven, instantiated once per provider in the dispatcher table.

use async_trait::async_trait;

use meridian_core::PaymentMethodType;

use crate::models::Order;

use super::gateway::{ChargeRequest, HttpGateway};
use super::{PaymentData, PaymentOutcome, PaymentStrategy};

/// Charge a client-side provider token through an HTTP gateway.
pub struct TokenChargeStrategy {
    method_type: PaymentMethodType,
    token_field: &'static str,
    gateway: HttpGateway,
}

impl TokenChargeStrategy {
    /// Build the strategy for one provider, with its conventional token
    /// field name.
    #[must_use]
    pub fn for_provider(method_type: PaymentMethodType, gateway: HttpGateway) -> Self {
        Self {
            method_type,
            token_field: token_field(method_type),
            gateway,
        }
    }
}

/// The `payment_data` field each provider's client integration submits.
const fn token_field(method_type: PaymentMethodType) -> &'static str {
    match method_type {
        PaymentMethodType::Stripe => "payment_method",
        PaymentMethodType::Paypal => "paypal_order_id",
        PaymentMethodType::AmazonPay => "charge_permission_id",
        PaymentMethodType::Klarna => "authorization_token",
        PaymentMethodType::Alipay => "auth_code",
        PaymentMethodType::Bitpay => "invoice_id",
        PaymentMethodType::GooglePay => "payment_token",
        // Offline methods never reach a token strategy; any field name is
        // inert for them.
        PaymentMethodType::Prepayment | PaymentMethodType::PayAtStore => "token",
    }
}

#[async_trait]
impl PaymentStrategy for TokenChargeStrategy {
    fn method_type(&self) -> PaymentMethodType {
        self.method_type
    }

    async fn process(&self, order: &Order, data: &PaymentData) -> PaymentOutcome {
        let Some(token) = data.str_field(self.token_field) else {
            return PaymentOutcome::declined(format!(
                "missing {} in payment data",
                self.token_field
            ));
        };
        let request = ChargeRequest {
            amount: order.total,
            currency: order.currency.as_str(),
            reference: &order.order_number,
            token,
        };
        match self.gateway.charge(&request).await {
            Ok(response) if response.approved => {
                let outcome = PaymentOutcome::approved(
                    response
                        .message
                        .unwrap_or_else(|| "payment approved".to_owned()),
                );
                match response.transaction_id {
                    Some(id) => outcome.with_transaction_id(id),
                    None => outcome,
                }
            }
            Ok(response) => PaymentOutcome::declined(
                response
                    .message
                    .unwrap_or_else(|| "payment declined".to_owned()),
            ),
            Err(err) => {
                tracing::warn!(
                    method = %self.method_type,
                    order_number = %order.order_number,
                    error = %err,
                    "payment gateway call failed"
                );
                PaymentOutcome::declined("payment provider unavailable")
            }
        }
    }
}
