//! Persistence for the checkout pipeline.
//!
//! All storage goes through the [`CheckoutStore`] trait so the services are
//! testable without a database. Two backends exist:
//!
//! - [`postgres::PgStore`] - production backend over `PostgreSQL`
//! - [`memory::MemoryStore`] - single-process backend for development and tests
//!
//! Two operations carry the pipeline's atomicity requirements and must be
//! atomic in every backend:
//!
//! - [`CheckoutStore::create_cart`] is insert-or-fetch on the unique session
//!   identity, so two racing first-requests from one client converge on one
//!   cart instead of creating duplicates.
//! - [`CheckoutStore::create_order`] re-validates stock, decrements it, and
//!   inserts the order and its items as one unit, so stock can never go
//!   negative under concurrent checkouts.

use async_trait::async_trait;

use meridian_core::{
    ArticleId, CartId, CartItemId, CurrencyCode, OrderId, PaymentMethodId, ShippingMethodId,
    UserId, VariantId,
};

use crate::models::{
    Article, Cart, CartItem, NewOrder, Order, OrderItem, PaymentMethod, ShippingMethod,
};

pub mod memory;
pub mod postgres;
pub mod seed;

pub use memory::MemoryStore;
pub use postgres::{PgStore, create_pool};

/// Errors produced by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The addressed row does not exist.
    #[error("row not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Order assembly found insufficient stock for the named articles.
    /// The whole assembly was aborted; nothing was written.
    #[error("insufficient stock for: {}", .0.join(", "))]
    OutOfStock(Vec<String>),

    /// Stored data failed to map back into a domain value.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, RepositoryError>;

/// Storage operations needed by the checkout pipeline.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    // -- Carts ---------------------------------------------------------------

    /// Load a cart by id.
    async fn find_cart(&self, id: CartId) -> StoreResult<Option<Cart>>;

    /// Load a user's most recently created cart.
    async fn find_cart_by_user(&self, user_id: UserId) -> StoreResult<Option<Cart>>;

    /// Load a cart by its anonymous session identity.
    async fn find_cart_by_session(&self, session_identity: &str) -> StoreResult<Option<Cart>>;

    /// Create a cart for the given identity, or return the existing one.
    ///
    /// Must be atomic: concurrent calls with the same `session_identity`
    /// return the same cart.
    async fn create_cart(
        &self,
        session_identity: &str,
        user_id: Option<UserId>,
        currency: CurrencyCode,
    ) -> StoreResult<Cart>;

    /// Delete a cart and all of its items.
    async fn delete_cart(&self, id: CartId) -> StoreResult<()>;

    // -- Cart items ----------------------------------------------------------

    /// All items of a cart, oldest first.
    async fn cart_items(&self, cart_id: CartId) -> StoreResult<Vec<CartItem>>;

    /// Load a single cart item.
    async fn find_cart_item(&self, id: CartItemId) -> StoreResult<Option<CartItem>>;

    /// Add `quantity` of an article to a cart.
    ///
    /// Increments the existing `(cart, article, variant)` row if present,
    /// otherwise inserts a new row with the given `unit_price` snapshot.
    /// Must be atomic with respect to concurrent adds of the same line.
    async fn add_or_increment_item(
        &self,
        cart_id: CartId,
        article_id: ArticleId,
        variant_id: Option<VariantId>,
        quantity: u32,
        unit_price: rust_decimal::Decimal,
    ) -> StoreResult<CartItem>;

    /// Overwrite an item's quantity.
    async fn set_item_quantity(&self, id: CartItemId, quantity: u32) -> StoreResult<CartItem>;

    /// Remove an item from its cart.
    async fn delete_cart_item(&self, id: CartItemId) -> StoreResult<()>;

    // -- Articles ------------------------------------------------------------

    /// Load an article by id.
    async fn find_article(&self, id: ArticleId) -> StoreResult<Option<Article>>;

    /// Insert or replace an article (seeding and catalog sync).
    async fn upsert_article(&self, article: &Article) -> StoreResult<()>;

    // -- Methods -------------------------------------------------------------

    /// Load a payment method by id.
    async fn find_payment_method(&self, id: PaymentMethodId)
    -> StoreResult<Option<PaymentMethod>>;

    /// All active payment methods, stable order.
    async fn list_payment_methods(&self) -> StoreResult<Vec<PaymentMethod>>;

    /// Insert or replace a payment method (seeding).
    async fn upsert_payment_method(&self, method: &PaymentMethod) -> StoreResult<()>;

    /// Load a shipping method by id.
    async fn find_shipping_method(
        &self,
        id: ShippingMethodId,
    ) -> StoreResult<Option<ShippingMethod>>;

    /// All active shipping methods, stable order.
    async fn list_shipping_methods(&self) -> StoreResult<Vec<ShippingMethod>>;

    /// Insert or replace a shipping method (seeding).
    async fn upsert_shipping_method(&self, method: &ShippingMethod) -> StoreResult<()>;

    // -- Orders --------------------------------------------------------------

    /// Atomically re-validate stock, decrement it, and persist the order.
    ///
    /// On any shortage the whole assembly aborts with
    /// [`RepositoryError::OutOfStock`] naming the offending articles, and no
    /// row is written or stock decremented.
    async fn create_order(&self, order: NewOrder) -> StoreResult<Order>;

    /// Persist an order's mutable fields (status, transaction id, timestamps).
    async fn update_order(&self, order: &Order) -> StoreResult<()>;

    /// Load an order by id.
    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// All items of an order.
    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>>;
}
