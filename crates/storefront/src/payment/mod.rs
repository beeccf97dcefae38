//! Payment dispatch.
//!
//! One uniform contract covers every way to pay: a [`PaymentStrategy`] takes
//! the persisted order plus the shopper's opaque `payment_data` and returns a
//! [`PaymentOutcome`]. The [`PaymentDispatcher`] holds a strategy table keyed
//! by [`meridian_core::PaymentMethodType`] and wraps every dispatch in a
//! bounded timeout; adding a provider means registering one more entry.
//!
//! Strategies never error out of the contract: declines, transport failures,
//! and timeouts all come back as `success == false` outcomes, so the
//! checkout service always ends the attempt in a terminal per-attempt state.

use async_trait::async_trait;
use serde::Deserialize;

use meridian_core::PaymentMethodType;

use crate::models::Order;

pub mod dispatcher;
pub mod gateway;
pub mod offline;
pub mod providers;

pub use dispatcher::PaymentDispatcher;
pub use gateway::{GatewayConfig, HttpGateway};

/// Opaque provider payload submitted by the shopper (tokens, nonces).
///
/// Strategies pull the fields they need; unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct PaymentData(serde_json::Value);

impl PaymentData {
    /// Wrap a raw JSON value.
    #[must_use]
    pub const fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// A string field of the payload, if present.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(serde_json::Value::as_str)
    }
}

/// The normalized result of a payment attempt.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub success: bool,
    pub message: String,
    /// Provider transaction reference, on success.
    pub transaction_id: Option<String>,
    /// Follow-up instructions for the shopper (offline methods).
    pub instructions: Option<String>,
}

impl PaymentOutcome {
    /// A successful payment.
    #[must_use]
    pub fn approved(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            transaction_id: None,
            instructions: None,
        }
    }

    /// A failed payment.
    #[must_use]
    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            transaction_id: None,
            instructions: None,
        }
    }

    /// Attach a provider transaction reference.
    #[must_use]
    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    /// Attach shopper-facing instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// One way to pay, behind the uniform contract.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// The method type this strategy serves.
    fn method_type(&self) -> PaymentMethodType;

    /// Execute payment for a persisted, `pending` order.
    async fn process(&self, order: &Order, data: &PaymentData) -> PaymentOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payment_data_fields() {
        let data = PaymentData::new(json!({"payment_method": "pm_123", "count": 3}));
        assert_eq!(data.str_field("payment_method"), Some("pm_123"));
        assert_eq!(data.str_field("count"), None);
        assert_eq!(data.str_field("missing"), None);
        assert_eq!(PaymentData::default().str_field("anything"), None);
    }

    #[test]
    fn test_outcome_builders() {
        let ok = PaymentOutcome::approved("done")
            .with_transaction_id("txn_1")
            .with_instructions("wait for mail");
        assert!(ok.success);
        assert_eq!(ok.transaction_id.as_deref(), Some("txn_1"));
        let no = PaymentOutcome::declined("nope");
        assert!(!no.success);
        assert!(no.transaction_id.is_none());
    }
}
