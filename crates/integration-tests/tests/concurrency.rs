//! Concurrency tests at the service layer.
//!
//! These exercise the two atomicity-critical operations under genuinely
//! concurrent tasks: the last-unit checkout race and the duplicate-cart
//! resolution race.

use std::sync::Arc;
use std::time::Duration;

use meridian_core::{ArticleId, CurrencyCode, Email, PaymentMethodId, ShippingMethodId};
use meridian_storefront::models::{Address, Article, RequestIdentity};
use meridian_storefront::payment::offline::PrepaymentStrategy;
use meridian_storefront::payment::{PaymentData, PaymentDispatcher};
use meridian_storefront::services::{
    CartService, CheckoutError, CheckoutInput, CheckoutService, LogNotifier,
};
use meridian_storefront::store::{CheckoutStore, MemoryStore, seed};
use rust_decimal_macros::dec;

fn identity(token: &str) -> RequestIdentity {
    RequestIdentity {
        session_token: token.to_owned(),
        user_id: None,
        cart_id: None,
    }
}

fn checkout_input() -> CheckoutInput {
    CheckoutInput {
        payment_method_id: PaymentMethodId::new(1),
        shipping_method_id: ShippingMethodId::new(1),
        email: Email::parse("shopper@example.com").expect("valid"),
        customer_name: "Test Shopper".to_owned(),
        shipping_address: Address {
            line1: "1 Main St".to_owned(),
            line2: None,
            city: "Springfield".to_owned(),
            postal_code: "12345".to_owned(),
            country: "US".to_owned(),
        },
        billing_address: None,
        payment_data: PaymentData::default(),
    }
}

async fn harness() -> (Arc<MemoryStore>, Arc<CartService>, Arc<CheckoutService>) {
    let store = Arc::new(MemoryStore::new());
    seed::demo_catalog(store.as_ref()).await.expect("seed");
    let mut payments = PaymentDispatcher::new(Duration::from_secs(5));
    payments.register(Box::new(PrepaymentStrategy));
    let carts = Arc::new(CartService::new(store.clone()));
    let checkout = Arc::new(CheckoutService::new(
        store.clone(),
        Arc::new(payments),
        Arc::new(LogNotifier),
    ));
    (store, carts, checkout)
}

#[tokio::test]
async fn test_concurrent_checkout_of_last_unit() {
    let (store, carts, checkout) = harness().await;

    // One unit left.
    store
        .upsert_article(&Article {
            id: ArticleId::new(50),
            sku: "LAST-ONE".to_owned(),
            name: "Last One".to_owned(),
            gross_price: dec!(10.00),
            stock: 1,
            ignore_stock: false,
            active: true,
        })
        .await
        .expect("seed");

    // Two shoppers, both holding the last unit in their carts.
    let cart_a = carts
        .resolve(&identity("sess-a"), CurrencyCode::USD)
        .await
        .expect("resolve");
    let cart_b = carts
        .resolve(&identity("sess-b"), CurrencyCode::USD)
        .await
        .expect("resolve");
    carts
        .add_item(&cart_a, ArticleId::new(50), None, 1)
        .await
        .expect("advisory check passes for a");
    carts
        .add_item(&cart_b, ArticleId::new(50), None, 1)
        .await
        .expect("advisory check passes for b");

    // Both check out at once.
    let task_a = tokio::spawn({
        let checkout = Arc::clone(&checkout);
        let cart = cart_a.clone();
        async move { checkout.process(&cart, checkout_input()).await }
    });
    let task_b = tokio::spawn({
        let checkout = Arc::clone(&checkout);
        let cart = cart_b.clone();
        async move { checkout.process(&cart, checkout_input()).await }
    });
    let result_a = task_a.await.expect("task a");
    let result_b = task_b.await.expect("task b");

    // Exactly one wins; the loser sees a stock error.
    let loser = match (&result_a, &result_b) {
        (Ok(_), Err(e)) | (Err(e), Ok(_)) => e,
        other => panic!("expected exactly one winner, got {other:?}"),
    };
    assert!(matches!(loser, CheckoutError::OutOfStock(names) if names == &["Last One"]));

    // Stock never went negative.
    let article = store
        .find_article(ArticleId::new(50))
        .await
        .expect("store")
        .expect("exists");
    assert_eq!(article.stock, 0);

    // The loser's cart is untouched.
    let loser_cart = if result_a.is_ok() { &cart_b } else { &cart_a };
    let items = store.cart_items(loser_cart.id).await.expect("items");
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_concurrent_first_requests_share_one_cart() {
    let (_store, carts, _checkout) = harness().await;

    let task_a = tokio::spawn({
        let carts = Arc::clone(&carts);
        async move { carts.resolve(&identity("sess-race"), CurrencyCode::USD).await }
    });
    let task_b = tokio::spawn({
        let carts = Arc::clone(&carts);
        async move { carts.resolve(&identity("sess-race"), CurrencyCode::USD).await }
    });

    let cart_a = task_a.await.expect("task a").expect("resolve");
    let cart_b = task_b.await.expect("task b").expect("resolve");
    assert_eq!(cart_a.id, cart_b.id, "insert-or-fetch must converge");
}

#[tokio::test]
async fn test_many_concurrent_adds_merge_into_one_line() {
    let (store, carts, _checkout) = harness().await;
    let cart = carts
        .resolve(&identity("sess-burst"), CurrencyCode::USD)
        .await
        .expect("resolve");

    // Gift card ignores stock; ten tasks add one unit each.
    let mut tasks = Vec::new();
    for _ in 0..10 {
        tasks.push(tokio::spawn({
            let carts = Arc::clone(&carts);
            let cart = cart.clone();
            async move { carts.add_item(&cart, ArticleId::new(3), None, 1).await }
        }));
    }
    for task in tasks {
        task.await.expect("task").expect("add");
    }

    let items = store.cart_items(cart.id).await.expect("items");
    assert_eq!(items.len(), 1, "adds must merge, not duplicate");
    assert_eq!(items.first().map(|i| i.quantity), Some(10));
}
