//! The strategy table.

use std::collections::HashMap;
use std::time::Duration;

use meridian_core::PaymentMethodType;

use crate::config::PaymentConfig;
use crate::models::Order;

use super::offline::{PayAtStoreStrategy, PrepaymentStrategy};
use super::providers::TokenChargeStrategy;
use super::{HttpGateway, PaymentData, PaymentOutcome, PaymentStrategy};

/// Routes a checkout to the strategy registered for the order's payment
/// method type, under a bounded timeout.
pub struct PaymentDispatcher {
    strategies: HashMap<PaymentMethodType, Box<dyn PaymentStrategy>>,
    timeout: Duration,
}

impl PaymentDispatcher {
    /// An empty dispatcher with the given per-dispatch timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            strategies: HashMap::new(),
            timeout,
        }
    }

    /// Build the production table from configuration: the offline methods
    /// are always available, online providers only when their gateway is
    /// configured.
    #[must_use]
    pub fn from_config(config: &PaymentConfig) -> Self {
        let mut dispatcher = Self::new(Duration::from_secs(config.timeout_secs));
        dispatcher.register(Box::new(PrepaymentStrategy));
        dispatcher.register(Box::new(PayAtStoreStrategy));
        for (method_type, gateway_config) in &config.gateways {
            match HttpGateway::new(gateway_config, dispatcher.timeout) {
                Ok(gateway) => dispatcher.register(Box::new(TokenChargeStrategy::for_provider(
                    *method_type,
                    gateway,
                ))),
                Err(err) => {
                    tracing::error!(
                        method = %method_type,
                        error = %err,
                        "failed to build payment gateway client; provider disabled"
                    );
                }
            }
        }
        dispatcher
    }

    /// Register a strategy under its own method type, replacing any previous
    /// entry for that type.
    pub fn register(&mut self, strategy: Box<dyn PaymentStrategy>) {
        self.strategies.insert(strategy.method_type(), strategy);
    }

    /// Whether a strategy is registered for `method_type`. Checked by the
    /// checkout service before the order is persisted.
    #[must_use]
    pub fn supports(&self, method_type: PaymentMethodType) -> bool {
        self.strategies.contains_key(&method_type)
    }

    /// Execute payment for the order.
    ///
    /// A timeout is a failed payment, never an indeterminate state; if the
    /// provider's true outcome is unknown, reconciliation happens elsewhere.
    pub async fn process(&self, order: &Order, data: &PaymentData) -> PaymentOutcome {
        let Some(strategy) = self.strategies.get(&order.payment_method_type) else {
            // The checkout service checks supports() before persisting; this
            // is a registration bug, reported as a failed payment.
            tracing::error!(
                method = %order.payment_method_type,
                "no payment strategy registered at dispatch time"
            );
            return PaymentOutcome::declined("payment method is not available");
        };
        match tokio::time::timeout(self.timeout, strategy.process(order, data)).await {
            Ok(outcome) => outcome,
            Err(_) => PaymentOutcome::declined("payment provider timed out"),
        }
    }
}
