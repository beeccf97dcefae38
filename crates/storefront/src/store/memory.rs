//! In-memory storage backend.
//!
//! Backs the `memory` dev backend and the test suite. One `Mutex` guards all
//! state and every trait method is a single critical section, which gives the
//! two atomicity-critical operations (`create_cart`, `create_order`) their
//! required semantics for free.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use meridian_core::{
    ArticleId, CartId, CartItemId, CurrencyCode, OrderId, OrderItemId, OrderStatus,
    PaymentMethodId, ShippingMethodId, UserId, VariantId,
};

use crate::models::{
    Article, Cart, CartItem, NewOrder, Order, OrderItem, PaymentMethod, ShippingMethod,
};
use crate::services::stock;

use super::{CheckoutStore, RepositoryError, StoreResult};

#[derive(Default)]
struct Inner {
    next_id: i64,
    carts: HashMap<CartId, Cart>,
    cart_items: HashMap<CartItemId, CartItem>,
    articles: HashMap<ArticleId, Article>,
    payment_methods: HashMap<PaymentMethodId, PaymentMethod>,
    shipping_methods: HashMap<ShippingMethodId, ShippingMethod>,
    orders: HashMap<OrderId, Order>,
    order_items: HashMap<OrderId, Vec<OrderItem>>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory [`CheckoutStore`] backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn find_cart(&self, id: CartId) -> StoreResult<Option<Cart>> {
        Ok(self.locked().carts.get(&id).cloned())
    }

    async fn find_cart_by_user(&self, user_id: UserId) -> StoreResult<Option<Cart>> {
        let inner = self.locked();
        Ok(inner
            .carts
            .values()
            .filter(|c| c.user_id == Some(user_id))
            .max_by_key(|c| (c.created_at, c.id))
            .cloned())
    }

    async fn find_cart_by_session(&self, session_identity: &str) -> StoreResult<Option<Cart>> {
        let inner = self.locked();
        Ok(inner
            .carts
            .values()
            .find(|c| c.session_identity == session_identity)
            .cloned())
    }

    async fn create_cart(
        &self,
        session_identity: &str,
        user_id: Option<UserId>,
        currency: CurrencyCode,
    ) -> StoreResult<Cart> {
        let mut inner = self.locked();
        // Insert-or-fetch under the one lock: the second of two racing
        // first-requests lands here and picks up the winner's cart.
        if let Some(existing) = inner
            .carts
            .values()
            .find(|c| c.session_identity == session_identity)
        {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(inner.next_id()),
            session_identity: session_identity.to_owned(),
            user_id,
            currency,
            created_at: now,
            updated_at: now,
        };
        inner.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn delete_cart(&self, id: CartId) -> StoreResult<()> {
        let mut inner = self.locked();
        inner.carts.remove(&id);
        inner.cart_items.retain(|_, item| item.cart_id != id);
        Ok(())
    }

    async fn cart_items(&self, cart_id: CartId) -> StoreResult<Vec<CartItem>> {
        let inner = self.locked();
        let mut items: Vec<CartItem> = inner
            .cart_items
            .values()
            .filter(|i| i.cart_id == cart_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.created_at, i.id));
        Ok(items)
    }

    async fn find_cart_item(&self, id: CartItemId) -> StoreResult<Option<CartItem>> {
        Ok(self.locked().cart_items.get(&id).cloned())
    }

    async fn add_or_increment_item(
        &self,
        cart_id: CartId,
        article_id: ArticleId,
        variant_id: Option<VariantId>,
        quantity: u32,
        unit_price: Decimal,
    ) -> StoreResult<CartItem> {
        let mut inner = self.locked();
        if let Some(existing) = inner.cart_items.values_mut().find(|i| {
            i.cart_id == cart_id && i.article_id == article_id && i.variant_id == variant_id
        }) {
            existing.quantity += quantity;
            let item = existing.clone();
            touch_cart(&mut inner, cart_id);
            return Ok(item);
        }
        let item = CartItem {
            id: CartItemId::new(inner.next_id()),
            cart_id,
            article_id,
            variant_id,
            quantity,
            unit_price,
            created_at: Utc::now(),
        };
        inner.cart_items.insert(item.id, item.clone());
        touch_cart(&mut inner, cart_id);
        Ok(item)
    }

    async fn set_item_quantity(&self, id: CartItemId, quantity: u32) -> StoreResult<CartItem> {
        let mut inner = self.locked();
        let item = inner
            .cart_items
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        item.quantity = quantity;
        let item = item.clone();
        touch_cart(&mut inner, item.cart_id);
        Ok(item)
    }

    async fn delete_cart_item(&self, id: CartItemId) -> StoreResult<()> {
        let mut inner = self.locked();
        let item = inner.cart_items.remove(&id).ok_or(RepositoryError::NotFound)?;
        touch_cart(&mut inner, item.cart_id);
        Ok(())
    }

    async fn find_article(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        Ok(self.locked().articles.get(&id).cloned())
    }

    async fn upsert_article(&self, article: &Article) -> StoreResult<()> {
        self.locked().articles.insert(article.id, article.clone());
        Ok(())
    }

    async fn find_payment_method(
        &self,
        id: PaymentMethodId,
    ) -> StoreResult<Option<PaymentMethod>> {
        Ok(self.locked().payment_methods.get(&id).cloned())
    }

    async fn list_payment_methods(&self) -> StoreResult<Vec<PaymentMethod>> {
        let inner = self.locked();
        let mut methods: Vec<PaymentMethod> = inner
            .payment_methods
            .values()
            .filter(|m| m.active)
            .cloned()
            .collect();
        methods.sort_by_key(|m| m.id);
        Ok(methods)
    }

    async fn upsert_payment_method(&self, method: &PaymentMethod) -> StoreResult<()> {
        self.locked()
            .payment_methods
            .insert(method.id, method.clone());
        Ok(())
    }

    async fn find_shipping_method(
        &self,
        id: ShippingMethodId,
    ) -> StoreResult<Option<ShippingMethod>> {
        Ok(self.locked().shipping_methods.get(&id).cloned())
    }

    async fn list_shipping_methods(&self) -> StoreResult<Vec<ShippingMethod>> {
        let inner = self.locked();
        let mut methods: Vec<ShippingMethod> = inner
            .shipping_methods
            .values()
            .filter(|m| m.active)
            .cloned()
            .collect();
        methods.sort_by_key(|m| m.id);
        Ok(methods)
    }

    async fn upsert_shipping_method(&self, method: &ShippingMethod) -> StoreResult<()> {
        self.locked()
            .shipping_methods
            .insert(method.id, method.clone());
        Ok(())
    }

    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        let mut inner = self.locked();

        // Authoritative stock re-check over every line before anything is
        // written. The single lock makes check + decrement + insert atomic
        // with respect to concurrent assemblies.
        let mut shortages = Vec::new();
        for item in &order.items {
            match inner.articles.get(&item.article_id) {
                Some(article) if stock::can_fulfill(article, item.quantity) => {}
                _ => shortages.push(item.name.clone()),
            }
        }
        if !shortages.is_empty() {
            return Err(RepositoryError::OutOfStock(shortages));
        }

        for item in &order.items {
            if let Some(article) = inner.articles.get_mut(&item.article_id)
                && !article.ignore_stock
            {
                article.stock -= item.quantity;
            }
        }

        let order_id = OrderId::new(inner.next_id());
        let items: Vec<OrderItem> = order
            .items
            .iter()
            .map(|item| OrderItem {
                id: OrderItemId::new(inner.next_id()),
                order_id,
                article_id: item.article_id,
                sku: item.sku.clone(),
                name: item.name.clone(),
                unit_price: item.unit_price,
                quantity: item.quantity,
            })
            .collect();
        let persisted = Order {
            id: order_id,
            order_number: order.order_number,
            status: OrderStatus::Pending,
            payment_method_id: order.payment_method_id,
            payment_method_type: order.payment_method_type,
            shipping_method_id: order.shipping_method_id,
            email: order.email,
            customer_name: order.customer_name,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            currency: order.currency,
            totals: order.totals,
            total: order.total,
            transaction_id: None,
            created_at: Utc::now(),
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
        };
        inner.orders.insert(order_id, persisted.clone());
        inner.order_items.insert(order_id, items);
        Ok(persisted)
    }

    async fn update_order(&self, order: &Order) -> StoreResult<()> {
        let mut inner = self.locked();
        let slot = inner
            .orders
            .get_mut(&order.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = order.clone();
        Ok(())
    }

    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.locked().orders.get(&id).cloned())
    }

    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>> {
        Ok(self
            .locked()
            .order_items
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }
}

fn touch_cart(inner: &mut Inner, cart_id: CartId) {
    if let Some(cart) = inner.carts.get_mut(&cart_id) {
        cart.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewOrderItem;
    use meridian_core::{Email, OrderTotals, PaymentMethodType};
    use rust_decimal_macros::dec;

    fn article(id: i64, stock: u32) -> Article {
        Article {
            id: ArticleId::new(id),
            sku: format!("SKU-{id}"),
            name: format!("Article {id}"),
            gross_price: dec!(10.00),
            stock,
            ignore_stock: false,
            active: true,
        }
    }

    fn new_order(article_id: ArticleId, quantity: u32) -> NewOrder {
        NewOrder {
            order_number: format!("ORD-TEST-{}", article_id.as_i64()),
            payment_method_id: PaymentMethodId::new(1),
            payment_method_type: PaymentMethodType::Prepayment,
            shipping_method_id: ShippingMethodId::new(1),
            email: Email::parse("shopper@example.com").expect("valid"),
            customer_name: "Shopper".to_owned(),
            shipping_address: crate::models::Address {
                line1: "1 Main St".to_owned(),
                line2: None,
                city: "Springfield".to_owned(),
                postal_code: "12345".to_owned(),
                country: "US".to_owned(),
            },
            billing_address: crate::models::Address {
                line1: "1 Main St".to_owned(),
                line2: None,
                city: "Springfield".to_owned(),
                postal_code: "12345".to_owned(),
                country: "US".to_owned(),
            },
            currency: CurrencyCode::USD,
            totals: OrderTotals::default(),
            total: dec!(0),
            items: vec![NewOrderItem {
                article_id,
                sku: "SKU".to_owned(),
                name: "Article".to_owned(),
                unit_price: dec!(10.00),
                quantity,
            }],
        }
    }

    #[tokio::test]
    async fn test_create_cart_is_insert_or_fetch() {
        let store = MemoryStore::new();
        let a = store
            .create_cart("sess-1", None, CurrencyCode::USD)
            .await
            .expect("create");
        let b = store
            .create_cart("sess-1", None, CurrencyCode::USD)
            .await
            .expect("fetch");
        assert_eq!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_add_or_increment_merges_lines() {
        let store = MemoryStore::new();
        let cart = store
            .create_cart("sess-1", None, CurrencyCode::USD)
            .await
            .expect("create");
        let first = store
            .add_or_increment_item(cart.id, ArticleId::new(1), None, 2, dec!(10.00))
            .await
            .expect("add");
        let second = store
            .add_or_increment_item(cart.id, ArticleId::new(1), None, 3, dec!(10.00))
            .await
            .expect("add");
        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 5);
        assert_eq!(store.cart_items(cart.id).await.expect("items").len(), 1);
    }

    #[tokio::test]
    async fn test_variant_gets_its_own_line() {
        let store = MemoryStore::new();
        let cart = store
            .create_cart("sess-1", None, CurrencyCode::USD)
            .await
            .expect("create");
        store
            .add_or_increment_item(cart.id, ArticleId::new(1), None, 1, dec!(10.00))
            .await
            .expect("add");
        store
            .add_or_increment_item(
                cart.id,
                ArticleId::new(1),
                Some(VariantId::new(7)),
                1,
                dec!(10.00),
            )
            .await
            .expect("add");
        assert_eq!(store.cart_items(cart.id).await.expect("items").len(), 2);
    }

    #[tokio::test]
    async fn test_create_order_decrements_stock() {
        let store = MemoryStore::new();
        store.upsert_article(&article(1, 5)).await.expect("seed");
        store
            .create_order(new_order(ArticleId::new(1), 3))
            .await
            .expect("assemble");
        let remaining = store
            .find_article(ArticleId::new(1))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(remaining.stock, 2);
    }

    #[tokio::test]
    async fn test_create_order_rejects_shortage_without_side_effects() {
        let store = MemoryStore::new();
        store.upsert_article(&article(1, 2)).await.expect("seed");
        let err = store
            .create_order(new_order(ArticleId::new(1), 3))
            .await
            .expect_err("shortage");
        assert!(matches!(err, RepositoryError::OutOfStock(ref names) if names.len() == 1));
        let untouched = store
            .find_article(ArticleId::new(1))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(untouched.stock, 2);
    }

    #[tokio::test]
    async fn test_delete_cart_removes_items() {
        let store = MemoryStore::new();
        let cart = store
            .create_cart("sess-1", None, CurrencyCode::USD)
            .await
            .expect("create");
        let item = store
            .add_or_increment_item(cart.id, ArticleId::new(1), None, 1, dec!(10.00))
            .await
            .expect("add");
        store.delete_cart(cart.id).await.expect("delete");
        assert!(store.find_cart(cart.id).await.expect("find").is_none());
        assert!(store.find_cart_item(item.id).await.expect("find").is_none());
    }
}
