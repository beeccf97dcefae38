//! Order notification seam.
//!
//! Every order status transition offers a notification to the external email
//! collaborator. Sending email is out of scope for the checkout core, so the
//! collaborator sits behind the [`Notifier`] trait; the checkout service
//! logs a notifier failure and moves on - a broken mail pipeline must never
//! fail a state transition.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Order;

/// A notification attempt failed.
#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Receiver of order lifecycle events.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Called after an order's status change has been persisted.
    async fn order_status_changed(&self, order: &Order) -> Result<(), NotifyError>;
}

/// Default notifier: writes a tracing event and nothing else.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_status_changed(&self, order: &Order) -> Result<(), NotifyError> {
        tracing::info!(
            order_number = %order.order_number,
            status = %order.status,
            "order status changed"
        );
        Ok(())
    }
}
