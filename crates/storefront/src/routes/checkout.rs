//! Checkout route handlers.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use meridian_core::{
    Email, OrderId, PaymentMethodId, PaymentMethodType, ShippingMethodId,
};
use rust_decimal::Decimal;

use crate::error::AppError;
use crate::models::session::forget_cart_id;
use crate::models::{Address, PaymentMethod, RequestIdentity, ShippingMethod};
use crate::payment::PaymentData;
use crate::services::{CartService, CheckoutInput, CheckoutService};
use crate::state::AppState;

/// One payment method as offered to clients.
#[derive(Debug, Serialize)]
pub struct PaymentMethodView {
    pub id: PaymentMethodId,
    pub name: String,
    #[serde(rename = "type")]
    pub method_type: PaymentMethodType,
    pub description: String,
    pub fee: Decimal,
}

impl From<PaymentMethod> for PaymentMethodView {
    fn from(method: PaymentMethod) -> Self {
        Self {
            id: method.id,
            name: method.name,
            method_type: method.method_type,
            description: method.description,
            fee: method.fee,
        }
    }
}

/// One shipping method as offered to clients.
#[derive(Debug, Serialize)]
pub struct ShippingMethodView {
    pub id: ShippingMethodId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub delivery_time: String,
}

impl From<ShippingMethod> for ShippingMethodView {
    fn from(method: ShippingMethod) -> Self {
        Self {
            id: method.id,
            name: method.name,
            description: method.description,
            price: method.price,
            delivery_time: method.delivery_time,
        }
    }
}

/// Response for `GET /checkout/methods`.
#[derive(Debug, Serialize)]
pub struct MethodsResponse {
    pub payment_methods: Vec<PaymentMethodView>,
    pub shipping_methods: Vec<ShippingMethodView>,
}

/// Request body for `POST /checkout/process`.
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub payment_method_id: PaymentMethodId,
    pub shipping_method_id: ShippingMethodId,
    pub email: String,
    pub name: String,
    pub shipping_address: Address,
    /// Defaults to the shipping address when omitted.
    pub billing_address: Option<Address>,
    /// Opaque provider payload (tokens, nonces).
    pub payment_data: Option<serde_json::Value>,
}

/// Response body for a successful `POST /checkout/process`.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub order_id: OrderId,
    pub order_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// `GET /checkout/methods` - active payment and shipping methods.
#[instrument(skip(state))]
pub async fn methods(State(state): State<AppState>) -> Result<Json<MethodsResponse>, AppError> {
    let checkout = CheckoutService::new(state.store(), state.payments(), state.notifier());
    let (payment, shipping) = checkout.methods().await?;
    Ok(Json(MethodsResponse {
        payment_methods: payment.into_iter().map(PaymentMethodView::from).collect(),
        shipping_methods: shipping.into_iter().map(ShippingMethodView::from).collect(),
    }))
}

/// `POST /checkout/process` - assemble an order from the cart and pay it.
#[instrument(skip(state, session, identity, request))]
pub async fn process(
    State(state): State<AppState>,
    session: Session,
    identity: RequestIdentity,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, AppError> {
    let email = Email::parse(&request.email)
        .map_err(|e| AppError::Validation(format!("invalid email: {e}")))?;
    let customer_name = request.name.trim().to_owned();
    if customer_name.is_empty() {
        return Err(AppError::Validation("name must not be empty".to_owned()));
    }

    let carts = CartService::new(state.store());
    let cart = carts.resolve(&identity, state.config().currency).await?;

    let checkout = CheckoutService::new(state.store(), state.payments(), state.notifier());
    let input = CheckoutInput {
        payment_method_id: request.payment_method_id,
        shipping_method_id: request.shipping_method_id,
        email,
        customer_name,
        shipping_address: request.shipping_address,
        billing_address: request.billing_address,
        payment_data: request.payment_data.map_or_else(PaymentData::default, PaymentData::new),
    };
    let outcome = checkout.process(&cart, input).await?;

    // The cart is gone; drop the session pointer so the next request starts
    // fresh.
    forget_cart_id(&session).await?;

    Ok(Json(ProcessResponse {
        success: true,
        order_id: outcome.order.id,
        order_number: outcome.order.order_number,
        transaction_id: outcome.order.transaction_id,
        instructions: outcome.instructions,
    }))
}
