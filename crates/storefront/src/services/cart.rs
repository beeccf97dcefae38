//! Cart identity resolution and cart mutation.
//!
//! # Resolution precedence
//!
//! Exactly one cart answers for a request, found in this order:
//!
//! 1. The session's cart-id pointer, if it still resolves. Authoritative
//!    even if the session token itself has changed since.
//! 2. The authenticated user's most recently created cart.
//! 3. The cart owned by the current session token.
//! 4. A newly created cart for the session token (and user, if any) -
//!    insert-or-fetch, so racing first-requests converge on one cart.
//!
//! The route layer writes the resolved id back into the session after every
//! resolution, which makes step 1 hit on all subsequent requests.

use std::sync::Arc;

use meridian_core::{ArticleId, CartItemId, CurrencyCode, VariantId};

use crate::models::{Cart, CartItem, CartTotals, RequestIdentity};
use crate::store::{CheckoutStore, RepositoryError};

use super::stock;

/// Server-side floor for a line quantity.
pub const MIN_QUANTITY: u32 = 1;
/// Server-side ceiling for a line quantity. Abuse guard, not business policy.
pub const MAX_QUANTITY: u32 = 100;

/// Clamp a client-supplied quantity into `[MIN_QUANTITY, MAX_QUANTITY]`.
#[must_use]
pub const fn clamp_quantity(quantity: u32) -> u32 {
    if quantity < MIN_QUANTITY {
        MIN_QUANTITY
    } else if quantity > MAX_QUANTITY {
        MAX_QUANTITY
    } else {
        quantity
    }
}

/// Errors from cart resolution and mutation.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// Unknown or inactive article.
    #[error("article not found")]
    ArticleNotFound,

    /// Unknown cart item.
    #[error("cart item not found")]
    ItemNotFound,

    /// The item exists but belongs to a different cart.
    #[error("cart item does not belong to this cart")]
    NotOwned,

    /// The stock validator rejected the requested quantity.
    #[error("insufficient stock for {article}")]
    InsufficientStock { article: String },

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cart resolution and mutation service.
pub struct CartService {
    store: Arc<dyn CheckoutStore>,
}

impl CartService {
    /// Create a service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn CheckoutStore>) -> Self {
        Self { store }
    }

    /// Resolve the request's cart, creating one if none exists.
    ///
    /// # Errors
    ///
    /// Only storage errors; absence of a cart is not possible, step 4 always
    /// produces one.
    pub async fn resolve(
        &self,
        identity: &RequestIdentity,
        currency: CurrencyCode,
    ) -> Result<Cart, CartError> {
        if let Some(cart) = self.peek(identity).await? {
            return Ok(cart);
        }
        let cart = self
            .store
            .create_cart(&identity.session_token, identity.user_id, currency)
            .await?;
        Ok(cart)
    }

    /// Resolution steps 1-3 only: find the request's cart without creating
    /// one. Read-only paths use this so browsing never creates cart rows.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn peek(&self, identity: &RequestIdentity) -> Result<Option<Cart>, CartError> {
        if let Some(cart_id) = identity.cart_id
            && let Some(cart) = self.store.find_cart(cart_id).await?
        {
            return Ok(Some(cart));
        }
        if let Some(user_id) = identity.user_id
            && let Some(cart) = self.store.find_cart_by_user(user_id).await?
        {
            return Ok(Some(cart));
        }
        if let Some(cart) = self
            .store
            .find_cart_by_session(&identity.session_token)
            .await?
        {
            return Ok(Some(cart));
        }
        Ok(None)
    }

    /// Add an article to the cart.
    ///
    /// The quantity is clamped, the article must exist and be active, and the
    /// stock validator must accept the resulting line quantity (existing plus
    /// added). An existing `(article, variant)` line is incremented; a new
    /// line snapshots the article's current gross price.
    ///
    /// # Errors
    ///
    /// `ArticleNotFound`, `InsufficientStock`, or storage errors.
    pub async fn add_item(
        &self,
        cart: &Cart,
        article_id: ArticleId,
        variant_id: Option<VariantId>,
        quantity: u32,
    ) -> Result<CartItem, CartError> {
        let quantity = clamp_quantity(quantity);
        let article = self
            .store
            .find_article(article_id)
            .await?
            .filter(|a| a.active)
            .ok_or(CartError::ArticleNotFound)?;

        // Advisory check against the would-be line total. Not a reservation:
        // assembly re-checks inside its transaction.
        let existing: u32 = self
            .store
            .cart_items(cart.id)
            .await?
            .iter()
            .filter(|i| i.article_id == article_id && i.variant_id == variant_id)
            .map(|i| i.quantity)
            .sum();
        if !stock::can_fulfill(&article, existing + quantity) {
            return Err(CartError::InsufficientStock {
                article: article.name,
            });
        }

        let item = self
            .store
            .add_or_increment_item(cart.id, article_id, variant_id, quantity, article.gross_price)
            .await?;
        Ok(item)
    }

    /// Overwrite a line's quantity (clamped).
    ///
    /// # Errors
    ///
    /// `ItemNotFound`, `NotOwned` if the item belongs to another cart, or
    /// storage errors.
    pub async fn update_item(
        &self,
        cart: &Cart,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem, CartError> {
        self.owned_item(cart, item_id).await?;
        let item = self
            .store
            .set_item_quantity(item_id, clamp_quantity(quantity))
            .await?;
        Ok(item)
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// `ItemNotFound`, `NotOwned` if the item belongs to another cart, or
    /// storage errors.
    pub async fn remove_item(&self, cart: &Cart, item_id: CartItemId) -> Result<(), CartError> {
        self.owned_item(cart, item_id).await?;
        self.store.delete_cart_item(item_id).await?;
        Ok(())
    }

    /// The cart's items and computed totals.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn view(&self, cart: &Cart) -> Result<(Vec<CartItem>, CartTotals), CartError> {
        let items = self.store.cart_items(cart.id).await?;
        let totals = CartTotals::of(&items);
        Ok((items, totals))
    }

    /// Load an item and verify it belongs to `cart`. Cross-cart ids are an
    /// authorization failure, never silently applied.
    async fn owned_item(&self, cart: &Cart, item_id: CartItemId) -> Result<CartItem, CartError> {
        let item = self
            .store
            .find_cart_item(item_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;
        if item.cart_id != cart.id {
            return Err(CartError::NotOwned);
        }
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;
    use crate::store::MemoryStore;
    use meridian_core::UserId;
    use rust_decimal_macros::dec;

    fn identity(token: &str) -> RequestIdentity {
        RequestIdentity {
            session_token: token.to_owned(),
            user_id: None,
            cart_id: None,
        }
    }

    async fn service_with_article(stock: u32, ignore_stock: bool) -> CartService {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_article(&Article {
                id: ArticleId::new(1),
                sku: "SKU-1".to_owned(),
                name: "Classic Mug".to_owned(),
                gross_price: dec!(12.50),
                stock,
                ignore_stock,
                active: true,
            })
            .await
            .expect("seed");
        CartService::new(store)
    }

    #[test]
    fn test_clamp_quantity() {
        assert_eq!(clamp_quantity(0), 1);
        assert_eq!(clamp_quantity(1), 1);
        assert_eq!(clamp_quantity(42), 42);
        assert_eq!(clamp_quantity(100), 100);
        assert_eq!(clamp_quantity(5000), 100);
    }

    #[tokio::test]
    async fn test_resolve_creates_then_reuses() {
        let service = service_with_article(10, false).await;
        let first = service
            .resolve(&identity("sess-a"), CurrencyCode::USD)
            .await
            .expect("resolve");
        let second = service
            .resolve(&identity("sess-a"), CurrencyCode::USD)
            .await
            .expect("resolve");
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_resolve_prefers_session_pointer() {
        let service = service_with_article(10, false).await;
        let original = service
            .resolve(&identity("sess-a"), CurrencyCode::USD)
            .await
            .expect("resolve");
        // Session token changed, but the pointer survives: still the same cart.
        let moved = RequestIdentity {
            session_token: "sess-b".to_owned(),
            user_id: None,
            cart_id: Some(original.id),
        };
        let resolved = service
            .resolve(&moved, CurrencyCode::USD)
            .await
            .expect("resolve");
        assert_eq!(resolved.id, original.id);
    }

    #[tokio::test]
    async fn test_resolve_adopts_user_cart() {
        let service = service_with_article(10, false).await;
        let user = UserId::new(7);
        let logged_in = RequestIdentity {
            session_token: "sess-old".to_owned(),
            user_id: Some(user),
            cart_id: None,
        };
        let original = service
            .resolve(&logged_in, CurrencyCode::USD)
            .await
            .expect("resolve");
        // Same user, brand new browser session, no pointer: user lookup wins.
        let new_device = RequestIdentity {
            session_token: "sess-new".to_owned(),
            user_id: Some(user),
            cart_id: None,
        };
        let resolved = service
            .resolve(&new_device, CurrencyCode::USD)
            .await
            .expect("resolve");
        assert_eq!(resolved.id, original.id);
    }

    #[tokio::test]
    async fn test_resolve_stale_pointer_falls_through() {
        let service = service_with_article(10, false).await;
        let stale = RequestIdentity {
            session_token: "sess-a".to_owned(),
            user_id: None,
            cart_id: Some(meridian_core::CartId::new(9999)),
        };
        let cart = service
            .resolve(&stale, CurrencyCode::USD)
            .await
            .expect("resolve");
        assert_eq!(cart.session_identity, "sess-a");
    }

    #[tokio::test]
    async fn test_peek_does_not_create() {
        let service = service_with_article(10, false).await;
        assert!(
            service
                .peek(&identity("sess-a"))
                .await
                .expect("peek")
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_concurrent_first_resolutions_converge() {
        let service = Arc::new(service_with_article(10, false).await);
        let (a, b) = tokio::join!(
            {
                let service = Arc::clone(&service);
                async move {
                    service
                        .resolve(&identity("sess-race"), CurrencyCode::USD)
                        .await
                }
            },
            {
                let service = Arc::clone(&service);
                async move {
                    service
                        .resolve(&identity("sess-race"), CurrencyCode::USD)
                        .await
                }
            }
        );
        assert_eq!(a.expect("resolve").id, b.expect("resolve").id);
    }

    #[tokio::test]
    async fn test_add_item_snapshots_price_and_merges() {
        let service = service_with_article(10, false).await;
        let cart = service
            .resolve(&identity("sess-a"), CurrencyCode::USD)
            .await
            .expect("resolve");
        let first = service
            .add_item(&cart, ArticleId::new(1), None, 2)
            .await
            .expect("add");
        assert_eq!(first.unit_price, dec!(12.50));
        let merged = service
            .add_item(&cart, ArticleId::new(1), None, 3)
            .await
            .expect("add");
        assert_eq!(merged.id, first.id);
        assert_eq!(merged.quantity, 5);
        let (items, totals) = service.view(&cart).await.expect("view");
        assert_eq!(items.len(), 1);
        assert_eq!(totals.subtotal, dec!(62.50));
        assert_eq!(totals.item_count, 5);
    }

    #[tokio::test]
    async fn test_add_item_checks_resulting_quantity() {
        // stock=5: add 3 passes, adding 3 more would need 6 and is rejected.
        let service = service_with_article(5, false).await;
        let cart = service
            .resolve(&identity("sess-a"), CurrencyCode::USD)
            .await
            .expect("resolve");
        service
            .add_item(&cart, ArticleId::new(1), None, 3)
            .await
            .expect("first add");
        let err = service
            .add_item(&cart, ArticleId::new(1), None, 3)
            .await
            .expect_err("second add exceeds stock");
        assert!(matches!(err, CartError::InsufficientStock { ref article } if article == "Classic Mug"));
        let (items, _) = service.view(&cart).await.expect("view");
        assert_eq!(items.first().map(|i| i.quantity), Some(3));
    }

    #[tokio::test]
    async fn test_add_item_ignore_stock_merges_past_stock() {
        let service = service_with_article(5, true).await;
        let cart = service
            .resolve(&identity("sess-a"), CurrencyCode::USD)
            .await
            .expect("resolve");
        service
            .add_item(&cart, ArticleId::new(1), None, 3)
            .await
            .expect("first add");
        let merged = service
            .add_item(&cart, ArticleId::new(1), None, 3)
            .await
            .expect("ignore_stock allows it");
        assert_eq!(merged.quantity, 6);
    }

    #[tokio::test]
    async fn test_add_unknown_or_inactive_article() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_article(&Article {
                id: ArticleId::new(2),
                sku: "SKU-2".to_owned(),
                name: "Retired Mug".to_owned(),
                gross_price: dec!(9.99),
                stock: 10,
                ignore_stock: false,
                active: false,
            })
            .await
            .expect("seed");
        let service = CartService::new(store);
        let cart = service
            .resolve(&identity("sess-a"), CurrencyCode::USD)
            .await
            .expect("resolve");

        let err = service
            .add_item(&cart, ArticleId::new(404), None, 1)
            .await
            .expect_err("unknown article");
        assert!(matches!(err, CartError::ArticleNotFound));

        let err = service
            .add_item(&cart, ArticleId::new(2), None, 1)
            .await
            .expect_err("inactive article");
        assert!(matches!(err, CartError::ArticleNotFound));
    }

    #[tokio::test]
    async fn test_cross_cart_item_is_authorization_error() {
        let service = service_with_article(10, false).await;
        let cart_a = service
            .resolve(&identity("sess-a"), CurrencyCode::USD)
            .await
            .expect("resolve");
        let cart_b = service
            .resolve(&identity("sess-b"), CurrencyCode::USD)
            .await
            .expect("resolve");
        let item = service
            .add_item(&cart_a, ArticleId::new(1), None, 2)
            .await
            .expect("add");

        let err = service
            .update_item(&cart_b, item.id, 9)
            .await
            .expect_err("foreign item");
        assert!(matches!(err, CartError::NotOwned));
        let err = service
            .remove_item(&cart_b, item.id)
            .await
            .expect_err("foreign item");
        assert!(matches!(err, CartError::NotOwned));

        // Both carts unchanged.
        let (items_a, _) = service.view(&cart_a).await.expect("view");
        assert_eq!(items_a.first().map(|i| i.quantity), Some(2));
        let (items_b, _) = service.view(&cart_b).await.expect("view");
        assert!(items_b.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let service = service_with_article(10, false).await;
        let cart = service
            .resolve(&identity("sess-a"), CurrencyCode::USD)
            .await
            .expect("resolve");
        let item = service
            .add_item(&cart, ArticleId::new(1), None, 2)
            .await
            .expect("add");

        let updated = service
            .update_item(&cart, item.id, 500)
            .await
            .expect("update");
        assert_eq!(updated.quantity, MAX_QUANTITY);

        service.remove_item(&cart, item.id).await.expect("remove");
        let (items, totals) = service.view(&cart).await.expect("view");
        assert!(items.is_empty());
        assert_eq!(totals.item_count, 0);

        let err = service
            .update_item(&cart, item.id, 1)
            .await
            .expect_err("gone");
        assert!(matches!(err, CartError::ItemNotFound));
    }
}
