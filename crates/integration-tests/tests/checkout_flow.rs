//! Checkout API flow tests.
//!
//! Demo catalog methods: payment 1 = prepayment, 2 = pay-at-store,
//! 3 = stripe (fee 1.50); shipping 1 = standard 4.99, 2 = express 12.99.

use axum::http::StatusCode;
use meridian_core::{OrderId, OrderStatus, PaymentMethodId, PaymentMethodType};
use meridian_integration_tests::{TestHarness, checkout_body};
use meridian_storefront::models::PaymentMethod;
use meridian_storefront::store::CheckoutStore;
use rust_decimal_macros::dec;
use serde_json::json;

fn add_body(article_id: i64, quantity: u32) -> serde_json::Value {
    json!({ "article_id": article_id, "quantity": quantity })
}

// ============================================================================
// Methods listing
// ============================================================================

#[tokio::test]
async fn test_methods_lists_active_payment_and_shipping() {
    let harness = TestHarness::spawn().await;
    let mut client = harness.client();

    let (status, body) = client.get("/checkout/methods").await;
    assert_eq!(status, StatusCode::OK);

    let payment = body["payment_methods"].as_array().expect("payment methods");
    assert_eq!(payment.len(), 3);
    assert_eq!(payment[0]["type"], "prepayment");
    assert_eq!(payment[1]["type"], "pay-at-store");
    assert_eq!(payment[2]["type"], "stripe");
    assert_eq!(payment[2]["fee"], "1.50");

    let shipping = body["shipping_methods"].as_array().expect("shipping methods");
    assert_eq!(shipping.len(), 2);
    assert_eq!(shipping[0]["price"], "4.99");
    assert_eq!(shipping[0]["delivery_time"], "2-4 business days");
}

// ============================================================================
// Successful checkout
// ============================================================================

#[tokio::test]
async fn test_successful_checkout_empties_cart_and_persists_order() {
    let harness = TestHarness::spawn().await;
    let mut client = harness.client();

    client.post("/cart/add", add_body(3, 1)).await;
    let (status, response) = client.post("/checkout/process", checkout_body(1, 1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], true);
    let order_number = response["order_number"].as_str().expect("order number");
    assert!(order_number.starts_with("ORD-"));
    assert!(
        response["instructions"]
            .as_str()
            .is_some_and(|i| i.contains(order_number))
    );

    // Cart is gone.
    let (_, cart) = client.get("/cart").await;
    assert_eq!(cart["items"], json!([]));

    // The order is durable with the right totals: 25.00 + 4.99 shipping.
    let order_id = OrderId::new(response["order_id"].as_i64().expect("order id"));
    let order = harness
        .store()
        .find_order(order_id)
        .await
        .expect("store")
        .expect("order exists");
    assert_eq!(order.status, OrderStatus::PaymentReceived);
    assert_eq!(order.order_number, order_number);
    assert_eq!(order.total, dec!(29.99));
    assert!(order.paid_at.is_some());

    // The shopper can start a fresh cart afterwards.
    let (status, body) = client.post("/cart/add", add_body(1, 1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totals"]["item_count"], 1);
}

#[tokio::test]
async fn test_totals_include_method_fee_and_shipping() {
    let harness = TestHarness::spawn().await;
    // A prepayment-typed method with a fee, so checkout succeeds offline.
    harness
        .store()
        .upsert_payment_method(&PaymentMethod {
            id: PaymentMethodId::new(9),
            name: "Invoice".to_owned(),
            method_type: PaymentMethodType::Prepayment,
            description: "Pay by invoice".to_owned(),
            fee: dec!(1.50),
            active: true,
        })
        .await
        .expect("store");

    let mut client = harness.client();
    client.post("/cart/add", add_body(1, 2)).await;
    let (status, body) = client.post("/checkout/process", checkout_body(9, 2)).await;
    assert_eq!(status, StatusCode::OK);

    let order_id = OrderId::new(body["order_id"].as_i64().expect("order id"));
    let order = harness
        .store()
        .find_order(order_id)
        .await
        .expect("store")
        .expect("order exists");
    // 2 x 12.50 + 12.99 express + 1.50 fee
    assert_eq!(order.totals.subtotal, dec!(25.00));
    assert_eq!(order.totals.shipping_cost, dec!(12.99));
    assert_eq!(order.totals.payment_fee, dec!(1.50));
    assert_eq!(order.total, dec!(39.49));
}

// ============================================================================
// Failed payment
// ============================================================================

#[tokio::test]
async fn test_failed_payment_keeps_cart_and_allows_retry() {
    let harness = TestHarness::spawn().await;
    let mut client = harness.client();

    client.post("/cart/add", add_body(1, 2)).await;

    // Stripe is configured against a dead gateway: the charge declines.
    let mut body = checkout_body(3, 1);
    body["payment_data"] = json!({ "payment_method": "pm_card_visa" });
    let (status, response) = client.post("/checkout/process", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
    assert_eq!(response["error"]["code"], "payment_failed");

    // Cart untouched: the shopper retries without re-entering items.
    let (_, cart) = client.get("/cart").await;
    assert_eq!(cart["items"][0]["quantity"], 2);

    // The retry assembles a fresh order and succeeds offline.
    let (status, response) = client.post("/checkout/process", checkout_body(1, 1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], true);
}

#[tokio::test]
async fn test_missing_provider_token_is_a_failed_payment() {
    let harness = TestHarness::spawn().await;
    let mut client = harness.client();

    client.post("/cart/add", add_body(1, 1)).await;
    // No payment_data at all: the strategy declines before calling out.
    let (status, response) = client.post("/checkout/process", checkout_body(3, 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "payment_failed");
    let (_, cart) = client.get("/cart").await;
    assert_eq!(cart["totals"]["item_count"], 1);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_empty_cart_checkout_is_validation_error() {
    let harness = TestHarness::spawn().await;
    let mut client = harness.client();

    let (status, body) = client.post("/checkout/process", checkout_body(1, 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation");
}

#[tokio::test]
async fn test_unknown_methods_are_validation_errors() {
    let harness = TestHarness::spawn().await;
    let mut client = harness.client();
    client.post("/cart/add", add_body(1, 1)).await;

    let (status, body) = client.post("/checkout/process", checkout_body(999, 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation");

    let (status, body) = client.post("/checkout/process", checkout_body(1, 999)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation");

    // The cart survived every rejected attempt.
    let (_, cart) = client.get("/cart").await;
    assert_eq!(cart["totals"]["item_count"], 1);
}

#[tokio::test]
async fn test_invalid_email_is_validation_error() {
    let harness = TestHarness::spawn().await;
    let mut client = harness.client();
    client.post("/cart/add", add_body(1, 1)).await;

    let mut body = checkout_body(1, 1);
    body["email"] = json!("not-an-email");
    let (status, response) = client.post("/checkout/process", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "validation");
}

// ============================================================================
// Stock at assembly time
// ============================================================================

#[tokio::test]
async fn test_second_checkout_of_last_units_gets_stock_error() {
    let harness = TestHarness::spawn().await;
    let mut alice = harness.client();
    let mut bob = harness.client();

    // Poster stock is 3; the advisory check passes for both carts because
    // adds never reserve stock.
    let (status, _) = alice.post("/cart/add", add_body(2, 3)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = bob.post("/cart/add", add_body(2, 3)).await;
    assert_eq!(status, StatusCode::OK);

    // Alice assembles first and takes the stock.
    let (status, _) = alice.post("/checkout/process", checkout_body(1, 1)).await;
    assert_eq!(status, StatusCode::OK);

    // Bob's assembly re-checks authoritatively and fails; his cart survives.
    let (status, body) = bob.post("/checkout/process", checkout_body(1, 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "stock");
    assert_eq!(body["error"]["articles"], json!(["A2 Poster"]));
    let (_, cart) = bob.get("/cart").await;
    assert_eq!(cart["items"][0]["quantity"], 3);
}
