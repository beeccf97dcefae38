//! Order assembly and payment orchestration.
//!
//! The pipeline for `POST /checkout/process`:
//!
//! 1. Validate the cart (non-empty) and the chosen methods (known, active,
//!    dispatchable) - all before anything is persisted.
//! 2. Assemble a [`NewOrder`]: snapshot method fees, article names/skus and
//!    cart prices, compute totals once.
//! 3. Persist via [`CheckoutStore::create_order`], which re-validates stock
//!    and decrements it atomically. The order is durable - in `pending` -
//!    before any payment attempt, so every attempt leaves an audit record.
//! 4. Dispatch payment. Success tears the cart down and moves the order to
//!    `payment_received`; failure moves it to `failed` and leaves the cart
//!    untouched for a retry (which assembles a fresh order).

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;

use meridian_core::{
    Email, InvalidTransition, OrderId, OrderStatus, OrderTotals, PaymentMethodId,
    PaymentMethodType, ShippingMethodId,
};

use crate::models::{
    Address, Cart, CartTotals, NewOrder, NewOrderItem, Order, PaymentMethod, ShippingMethod,
};
use crate::payment::{PaymentData, PaymentDispatcher};
use crate::store::{CheckoutStore, RepositoryError};

use super::notify::Notifier;

/// Length of the random order-number suffix.
const ORDER_NUMBER_SUFFIX_LEN: usize = 8;

/// Errors from checkout processing.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The resolved cart has no items.
    #[error("cart is empty")]
    EmptyCart,

    /// Unknown or inactive payment method id.
    #[error("unknown or inactive payment method")]
    UnknownPaymentMethod,

    /// Unknown or inactive shipping method id.
    #[error("unknown or inactive shipping method")]
    UnknownShippingMethod,

    /// The method exists but no strategy is registered for its type.
    #[error("payment method {0} is not available")]
    UnsupportedPaymentMethod(PaymentMethodType),

    /// Authoritative stock validation failed for the named articles.
    #[error("insufficient stock for: {}", .0.join(", "))]
    OutOfStock(Vec<String>),

    /// The dispatcher reported failure (or timed out). The order is
    /// persisted in `failed` state; the cart is untouched.
    #[error("payment failed: {message}")]
    PaymentDeclined { order_id: OrderId, message: String },

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A state transition the pipeline itself performed was illegal. This is
    /// a bug, not a user error.
    #[error("order state error: {0}")]
    State(#[from] InvalidTransition),
}

/// Everything the shopper submits to `POST /checkout/process`, already
/// shape-validated by the route layer.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub payment_method_id: PaymentMethodId,
    pub shipping_method_id: ShippingMethodId,
    pub email: Email,
    pub customer_name: String,
    pub shipping_address: Address,
    /// Defaults to the shipping address when omitted.
    pub billing_address: Option<Address>,
    pub payment_data: PaymentData,
}

/// A successfully paid checkout.
#[derive(Debug)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub message: String,
    /// Follow-up instructions for offline methods (bank transfer, pickup).
    pub instructions: Option<String>,
}

/// Checkout orchestration service.
pub struct CheckoutService {
    store: Arc<dyn CheckoutStore>,
    payments: Arc<PaymentDispatcher>,
    notifier: Arc<dyn Notifier>,
}

impl CheckoutService {
    /// Create a service over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn CheckoutStore>,
        payments: Arc<PaymentDispatcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            payments,
            notifier,
        }
    }

    /// The active payment and shipping methods, for the checkout page.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn methods(
        &self,
    ) -> Result<(Vec<PaymentMethod>, Vec<ShippingMethod>), CheckoutError> {
        let payment = self.store.list_payment_methods().await?;
        let shipping = self.store.list_shipping_methods().await?;
        Ok((payment, shipping))
    }

    /// Run the full checkout pipeline for `cart`.
    ///
    /// # Errors
    ///
    /// Validation errors reject before persistence; `OutOfStock` rejects
    /// during the assembly transaction (nothing written); `PaymentDeclined`
    /// leaves a durable `failed` order and an untouched cart.
    pub async fn process(
        &self,
        cart: &Cart,
        input: CheckoutInput,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let items = self.store.cart_items(cart.id).await?;
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let payment_method = self
            .store
            .find_payment_method(input.payment_method_id)
            .await?
            .filter(|m| m.active)
            .ok_or(CheckoutError::UnknownPaymentMethod)?;
        let shipping_method = self
            .store
            .find_shipping_method(input.shipping_method_id)
            .await?
            .filter(|m| m.active)
            .ok_or(CheckoutError::UnknownShippingMethod)?;
        // A method nobody can dispatch must fail here, before the order row
        // exists.
        if !self.payments.supports(payment_method.method_type) {
            return Err(CheckoutError::UnsupportedPaymentMethod(
                payment_method.method_type,
            ));
        }

        // Order items denormalize the article's current name/sku and the cart
        // line's price snapshot; the order stops referencing live data here.
        let mut order_items = Vec::with_capacity(items.len());
        let mut missing = Vec::new();
        for item in &items {
            match self.store.find_article(item.article_id).await? {
                Some(article) => order_items.push(NewOrderItem {
                    article_id: item.article_id,
                    sku: article.sku,
                    name: article.name,
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                }),
                None => missing.push(format!("article {}", item.article_id)),
            }
        }
        if !missing.is_empty() {
            return Err(CheckoutError::OutOfStock(missing));
        }

        let totals = OrderTotals {
            subtotal: CartTotals::of(&items).subtotal,
            shipping_cost: shipping_method.price,
            payment_fee: payment_method.fee,
            tax_amount: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
        };
        let billing_address = input
            .billing_address
            .unwrap_or_else(|| input.shipping_address.clone());
        let draft = NewOrder {
            order_number: generate_order_number(),
            payment_method_id: payment_method.id,
            payment_method_type: payment_method.method_type,
            shipping_method_id: shipping_method.id,
            email: input.email,
            customer_name: input.customer_name,
            shipping_address: input.shipping_address,
            billing_address,
            currency: cart.currency,
            totals,
            total: totals.total(),
            items: order_items,
        };

        let mut order = self.store.create_order(draft).await.map_err(|e| match e {
            RepositoryError::OutOfStock(names) => CheckoutError::OutOfStock(names),
            other => CheckoutError::Repository(other),
        })?;
        tracing::info!(
            order_number = %order.order_number,
            total = %order.total,
            method = %order.payment_method_type,
            "order assembled"
        );

        let outcome = self.payments.process(&order, &input.payment_data).await;
        if outcome.success {
            order.transaction_id = outcome.transaction_id;
            order.transition_to(OrderStatus::PaymentReceived, Utc::now())?;
            self.store.update_order(&order).await?;
            // Teardown only on confirmed payment, never earlier.
            self.store.delete_cart(cart.id).await?;
            self.notify(&order).await;
            Ok(CheckoutOutcome {
                order,
                message: outcome.message,
                instructions: outcome.instructions,
            })
        } else {
            order.transition_to(OrderStatus::Failed, Utc::now())?;
            self.store.update_order(&order).await?;
            self.notify(&order).await;
            tracing::warn!(
                order_number = %order.order_number,
                message = %outcome.message,
                "payment failed"
            );
            Err(CheckoutError::PaymentDeclined {
                order_id: order.id,
                message: outcome.message,
            })
        }
    }

    /// Offer the transition to the email collaborator; log and swallow
    /// failures - notifications must never fail a checkout.
    async fn notify(&self, order: &Order) {
        if let Err(err) = self.notifier.order_status_changed(order).await {
            tracing::warn!(
                order_number = %order.order_number,
                error = %err,
                "order notification failed"
            );
        }
    }
}

/// Generate an order number: `ORD-<date>-<random suffix>`.
///
/// Uniqueness is enforced by the store; the random suffix makes collisions
/// practically impossible within a day.
fn generate_order_number() -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(ORDER_NUMBER_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!(
        "ORD-{}-{}",
        Utc::now().format("%Y%m%d"),
        suffix.to_uppercase()
    )
}
