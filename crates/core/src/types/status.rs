//! Order status state machine.
//!
//! An order moves strictly forward through its lifecycle:
//!
//! ```text
//! pending ──► payment_received ──► processing ──► shipped ──► delivered
//!    │                │                 │
//!    ├──► failed      └────► cancelled ◄┘   (cancelled reachable from any
//!    └──► cancelled                          pre-shipped state)
//! ```
//!
//! `delivered`, `failed`, and `cancelled` are terminal. No transition may
//! move an order backward; illegal transitions are rejected with
//! [`InvalidTransition`] rather than silently ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order assembled, payment not yet confirmed. Initial state.
    #[default]
    Pending,
    /// Payment confirmed by the dispatcher.
    PaymentReceived,
    /// Order is being picked and packed.
    Processing,
    /// Order handed to the carrier.
    Shipped,
    /// Order arrived at the customer. Terminal.
    Delivered,
    /// Payment attempt failed. Terminal for this order instance.
    Failed,
    /// Order cancelled before shipment. Terminal.
    Cancelled,
}

/// Attempted an illegal order status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid order status transition: {from} -> {to}")]
pub struct InvalidTransition {
    /// Status the order was in.
    pub from: OrderStatus,
    /// Status that was requested.
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Returns `true` if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed | Self::Cancelled)
    }

    /// Returns `true` if moving from `self` to `to` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::PaymentReceived | Self::Failed | Self::Cancelled)
                | (Self::PaymentReceived, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Validate and perform a transition.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if the transition is not legal.
    pub const fn transition_to(self, to: Self) -> Result<Self, InvalidTransition> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }

    /// The wire/database representation of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PaymentReceived => "payment_received",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "payment_received" => Ok(Self::PaymentReceived),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let status = OrderStatus::Pending;
        let status = status.transition_to(OrderStatus::PaymentReceived).expect("pay");
        let status = status.transition_to(OrderStatus::Processing).expect("process");
        let status = status.transition_to(OrderStatus::Shipped).expect("ship");
        let status = status.transition_to(OrderStatus::Delivered).expect("deliver");
        assert!(status.is_terminal());
    }

    #[test]
    fn test_pending_can_fail() {
        let status = OrderStatus::Pending
            .transition_to(OrderStatus::Failed)
            .expect("fail");
        assert!(status.is_terminal());
    }

    #[test]
    fn test_cancelled_reachable_pre_shipment_only() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::PaymentReceived.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!OrderStatus::PaymentReceived.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::PaymentReceived));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Processing));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for terminal in [
            OrderStatus::Delivered,
            OrderStatus::Failed,
            OrderStatus::Cancelled,
        ] {
            for target in [
                OrderStatus::Pending,
                OrderStatus::PaymentReceived,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
                OrderStatus::Failed,
                OrderStatus::Cancelled,
            ] {
                assert!(
                    !terminal.can_transition_to(target),
                    "{terminal} -> {target} must be illegal"
                );
            }
        }
    }

    #[test]
    fn test_invalid_transition_error_names_states() {
        let err = OrderStatus::Delivered
            .transition_to(OrderStatus::Pending)
            .expect_err("must be rejected");
        assert_eq!(err.from, OrderStatus::Delivered);
        assert_eq!(err.to, OrderStatus::Pending);
        assert!(err.to_string().contains("delivered"));
    }

    #[test]
    fn test_str_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::PaymentReceived,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Failed,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.as_str().parse().expect("parse");
            assert_eq!(parsed, status);
        }
    }
}
