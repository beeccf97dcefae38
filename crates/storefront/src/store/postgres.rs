//! `PostgreSQL` storage backend.
//!
//! Queries are runtime-bound (`sqlx::query_as`) so the workspace builds
//! without a live database. The two atomicity-critical operations map to:
//!
//! - `create_cart`: `INSERT ... ON CONFLICT (session_identity) DO NOTHING`
//!   followed by a fetch, so racing first-requests converge on one row.
//! - `create_order`: one transaction that locks every touched article with
//!   `SELECT ... FOR UPDATE` (in id order, to keep lock acquisition
//!   deadlock-free), re-validates stock, decrements it, and inserts the
//!   order and its items.
//!
//! Migrations live in `crates/storefront/migrations/` and are applied with
//! `sqlx::migrate!` at startup.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use meridian_core::{
    ArticleId, CartId, CartItemId, CurrencyCode, Email, OrderId, OrderItemId, OrderStatus,
    PaymentMethodId, PaymentMethodType, ShippingMethodId, UserId, VariantId,
};

use crate::models::{
    Address, Article, Cart, CartItem, NewOrder, Order, OrderItem, PaymentMethod, ShippingMethod,
};
use crate::services::stock;

use super::{CheckoutStore, RepositoryError, StoreResult};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// `PostgreSQL`-backed [`CheckoutStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run pending migrations.
    ///
    /// # Errors
    ///
    /// Returns the migration error if any migration fails to apply.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct CartRow {
    id: i64,
    session_identity: String,
    user_id: Option<i64>,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CartRow {
    fn into_cart(self) -> StoreResult<Cart> {
        Ok(Cart {
            id: CartId::new(self.id),
            session_identity: self.session_identity,
            user_id: self.user_id.map(UserId::new),
            currency: parse_currency(&self.currency)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: i64,
    cart_id: i64,
    article_id: i64,
    variant_id: Option<i64>,
    quantity: i64,
    unit_price: Decimal,
    created_at: DateTime<Utc>,
}

impl CartItemRow {
    fn into_item(self) -> StoreResult<CartItem> {
        Ok(CartItem {
            id: CartItemId::new(self.id),
            cart_id: CartId::new(self.cart_id),
            article_id: ArticleId::new(self.article_id),
            variant_id: self.variant_id.map(VariantId::new),
            quantity: to_quantity(self.quantity)?,
            unit_price: self.unit_price,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    sku: String,
    name: String,
    gross_price: Decimal,
    stock: i64,
    ignore_stock: bool,
    active: bool,
}

impl ArticleRow {
    fn into_article(self) -> StoreResult<Article> {
        Ok(Article {
            id: ArticleId::new(self.id),
            sku: self.sku,
            name: self.name,
            gross_price: self.gross_price,
            stock: to_quantity(self.stock)?,
            ignore_stock: self.ignore_stock,
            active: self.active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentMethodRow {
    id: i64,
    name: String,
    method_type: String,
    description: String,
    fee: Decimal,
    active: bool,
}

impl PaymentMethodRow {
    fn into_method(self) -> StoreResult<PaymentMethod> {
        let method_type: PaymentMethodType = self
            .method_type
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        Ok(PaymentMethod {
            id: PaymentMethodId::new(self.id),
            name: self.name,
            method_type,
            description: self.description,
            fee: self.fee,
            active: self.active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ShippingMethodRow {
    id: i64,
    name: String,
    description: String,
    price: Decimal,
    delivery_time: String,
    active: bool,
}

impl ShippingMethodRow {
    fn into_method(self) -> ShippingMethod {
        ShippingMethod {
            id: ShippingMethodId::new(self.id),
            name: self.name,
            description: self.description,
            price: self.price,
            delivery_time: self.delivery_time,
            active: self.active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    status: String,
    payment_method_id: i64,
    payment_method_type: String,
    shipping_method_id: i64,
    email: String,
    customer_name: String,
    ship_line1: String,
    ship_line2: Option<String>,
    ship_city: String,
    ship_postal_code: String,
    ship_country: String,
    bill_line1: String,
    bill_line2: Option<String>,
    bill_city: String,
    bill_postal_code: String,
    bill_country: String,
    currency: String,
    subtotal: Decimal,
    shipping_cost: Decimal,
    payment_fee: Decimal,
    tax_amount: Decimal,
    discount_amount: Decimal,
    total: Decimal,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self) -> StoreResult<Order> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let payment_method_type: PaymentMethodType = self
            .payment_method_type
            .parse()
            .map_err(RepositoryError::DataCorruption)?;
        let email = Email::parse(&self.email)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid email: {e}")))?;
        Ok(Order {
            id: OrderId::new(self.id),
            order_number: self.order_number,
            status,
            payment_method_id: PaymentMethodId::new(self.payment_method_id),
            payment_method_type,
            shipping_method_id: ShippingMethodId::new(self.shipping_method_id),
            email,
            customer_name: self.customer_name,
            shipping_address: Address {
                line1: self.ship_line1,
                line2: self.ship_line2,
                city: self.ship_city,
                postal_code: self.ship_postal_code,
                country: self.ship_country,
            },
            billing_address: Address {
                line1: self.bill_line1,
                line2: self.bill_line2,
                city: self.bill_city,
                postal_code: self.bill_postal_code,
                country: self.bill_country,
            },
            currency: parse_currency(&self.currency)?,
            totals: meridian_core::OrderTotals {
                subtotal: self.subtotal,
                shipping_cost: self.shipping_cost,
                payment_fee: self.payment_fee,
                tax_amount: self.tax_amount,
                discount_amount: self.discount_amount,
            },
            total: self.total,
            transaction_id: self.transaction_id,
            created_at: self.created_at,
            paid_at: self.paid_at,
            shipped_at: self.shipped_at,
            delivered_at: self.delivered_at,
            cancelled_at: self.cancelled_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    article_id: i64,
    sku: String,
    name: String,
    unit_price: Decimal,
    quantity: i64,
}

impl OrderItemRow {
    fn into_item(self) -> StoreResult<OrderItem> {
        Ok(OrderItem {
            id: OrderItemId::new(self.id),
            order_id: OrderId::new(self.order_id),
            article_id: ArticleId::new(self.article_id),
            sku: self.sku,
            name: self.name,
            unit_price: self.unit_price,
            quantity: to_quantity(self.quantity)?,
        })
    }
}

fn parse_currency(code: &str) -> StoreResult<CurrencyCode> {
    code.parse().map_err(RepositoryError::DataCorruption)
}

fn to_quantity(value: i64) -> StoreResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("quantity out of range: {value}")))
}

fn map_unique_violation(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(err)
}

const CART_COLUMNS: &str = "id, session_identity, user_id, currency, created_at, updated_at";
const CART_ITEM_COLUMNS: &str =
    "id, cart_id, article_id, variant_id, quantity, unit_price, created_at";
const ARTICLE_COLUMNS: &str = "id, sku, name, gross_price, stock, ignore_stock, active";
const ORDER_COLUMNS: &str = "id, order_number, status, payment_method_id, payment_method_type, \
     shipping_method_id, email, customer_name, ship_line1, ship_line2, ship_city, \
     ship_postal_code, ship_country, bill_line1, bill_line2, bill_city, bill_postal_code, \
     bill_country, currency, subtotal, shipping_cost, payment_fee, tax_amount, discount_amount, \
     total, transaction_id, created_at, paid_at, shipped_at, delivered_at, cancelled_at";

// =============================================================================
// CheckoutStore implementation
// =============================================================================

#[async_trait]
impl CheckoutStore for PgStore {
    async fn find_cart(&self, id: CartId) -> StoreResult<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM cart WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(CartRow::into_cart).transpose()
    }

    async fn find_cart_by_user(&self, user_id: UserId) -> StoreResult<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM cart WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(CartRow::into_cart).transpose()
    }

    async fn find_cart_by_session(&self, session_identity: &str) -> StoreResult<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM cart WHERE session_identity = $1"
        ))
        .bind(session_identity)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CartRow::into_cart).transpose()
    }

    async fn create_cart(
        &self,
        session_identity: &str,
        user_id: Option<UserId>,
        currency: CurrencyCode,
    ) -> StoreResult<Cart> {
        // Insert-or-fetch: DO NOTHING on conflict, then read whichever row won.
        let inserted = sqlx::query_as::<_, CartRow>(&format!(
            "INSERT INTO cart (session_identity, user_id, currency) VALUES ($1, $2, $3) \
             ON CONFLICT (session_identity) DO NOTHING \
             RETURNING {CART_COLUMNS}"
        ))
        .bind(session_identity)
        .bind(user_id.map(|u| u.as_i64()))
        .bind(currency.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => row.into_cart(),
            None => self
                .find_cart_by_session(session_identity)
                .await?
                .ok_or_else(|| {
                    RepositoryError::DataCorruption(
                        "cart vanished between insert and fetch".to_owned(),
                    )
                }),
        }
    }

    async fn delete_cart(&self, id: CartId) -> StoreResult<()> {
        // cart_item rows go with it via ON DELETE CASCADE.
        sqlx::query("DELETE FROM cart WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn cart_items(&self, cart_id: CartId) -> StoreResult<Vec<CartItem>> {
        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_item WHERE cart_id = $1 \
             ORDER BY created_at, id"
        ))
        .bind(cart_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CartItemRow::into_item).collect()
    }

    async fn find_cart_item(&self, id: CartItemId) -> StoreResult<Option<CartItem>> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_item WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(CartItemRow::into_item).transpose()
    }

    async fn add_or_increment_item(
        &self,
        cart_id: CartId,
        article_id: ArticleId,
        variant_id: Option<VariantId>,
        quantity: u32,
        unit_price: Decimal,
    ) -> StoreResult<CartItem> {
        let mut tx = self.pool.begin().await?;
        // The (cart_id, article_id, variant_id) unique index is declared
        // NULLS NOT DISTINCT so variant-less lines also merge.
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "INSERT INTO cart_item (cart_id, article_id, variant_id, quantity, unit_price) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (cart_id, article_id, variant_id) \
             DO UPDATE SET quantity = cart_item.quantity + EXCLUDED.quantity \
             RETURNING {CART_ITEM_COLUMNS}"
        ))
        .bind(cart_id.as_i64())
        .bind(article_id.as_i64())
        .bind(variant_id.map(|v| v.as_i64()))
        .bind(i64::from(quantity))
        .bind(unit_price)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("UPDATE cart SET updated_at = now() WHERE id = $1")
            .bind(cart_id.as_i64())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        row.into_item()
    }

    async fn set_item_quantity(&self, id: CartItemId, quantity: u32) -> StoreResult<CartItem> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "UPDATE cart_item SET quantity = $2 WHERE id = $1 RETURNING {CART_ITEM_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        row.into_item()
    }

    async fn delete_cart_item(&self, id: CartItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM cart_item WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_article(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM article WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ArticleRow::into_article).transpose()
    }

    async fn upsert_article(&self, article: &Article) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO article (id, sku, name, gross_price, stock, ignore_stock, active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET sku = EXCLUDED.sku, name = EXCLUDED.name, \
             gross_price = EXCLUDED.gross_price, stock = EXCLUDED.stock, \
             ignore_stock = EXCLUDED.ignore_stock, active = EXCLUDED.active",
        )
        .bind(article.id.as_i64())
        .bind(&article.sku)
        .bind(&article.name)
        .bind(article.gross_price)
        .bind(i64::from(article.stock))
        .bind(article.ignore_stock)
        .bind(article.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_payment_method(
        &self,
        id: PaymentMethodId,
    ) -> StoreResult<Option<PaymentMethod>> {
        let row = sqlx::query_as::<_, PaymentMethodRow>(
            "SELECT id, name, method_type, description, fee, active \
             FROM payment_method WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(PaymentMethodRow::into_method).transpose()
    }

    async fn list_payment_methods(&self) -> StoreResult<Vec<PaymentMethod>> {
        let rows = sqlx::query_as::<_, PaymentMethodRow>(
            "SELECT id, name, method_type, description, fee, active \
             FROM payment_method WHERE active ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PaymentMethodRow::into_method).collect()
    }

    async fn upsert_payment_method(&self, method: &PaymentMethod) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO payment_method (id, name, method_type, description, fee, active) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, \
             method_type = EXCLUDED.method_type, description = EXCLUDED.description, \
             fee = EXCLUDED.fee, active = EXCLUDED.active",
        )
        .bind(method.id.as_i64())
        .bind(&method.name)
        .bind(method.method_type.as_str())
        .bind(&method.description)
        .bind(method.fee)
        .bind(method.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_shipping_method(
        &self,
        id: ShippingMethodId,
    ) -> StoreResult<Option<ShippingMethod>> {
        let row = sqlx::query_as::<_, ShippingMethodRow>(
            "SELECT id, name, description, price, delivery_time, active \
             FROM shipping_method WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ShippingMethodRow::into_method))
    }

    async fn list_shipping_methods(&self) -> StoreResult<Vec<ShippingMethod>> {
        let rows = sqlx::query_as::<_, ShippingMethodRow>(
            "SELECT id, name, description, price, delivery_time, active \
             FROM shipping_method WHERE active ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ShippingMethodRow::into_method).collect())
    }

    async fn upsert_shipping_method(&self, method: &ShippingMethod) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO shipping_method (id, name, description, price, delivery_time, active) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, \
             description = EXCLUDED.description, price = EXCLUDED.price, \
             delivery_time = EXCLUDED.delivery_time, active = EXCLUDED.active",
        )
        .bind(method.id.as_i64())
        .bind(&method.name)
        .bind(&method.description)
        .bind(method.price)
        .bind(&method.delivery_time)
        .bind(method.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_order(&self, order: NewOrder) -> StoreResult<Order> {
        let mut tx = self.pool.begin().await?;

        // Lock every touched article in id order, then re-validate the whole
        // cart against the locked rows. Aborting the transaction undoes
        // nothing because nothing has been written yet.
        let mut article_ids: Vec<i64> =
            order.items.iter().map(|i| i.article_id.as_i64()).collect();
        article_ids.sort_unstable();
        article_ids.dedup();
        let locked = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM article WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(&article_ids)
        .fetch_all(&mut *tx)
        .await?;
        let articles: std::collections::HashMap<ArticleId, Article> = locked
            .into_iter()
            .map(|row| row.into_article().map(|a| (a.id, a)))
            .collect::<StoreResult<_>>()?;

        let mut shortages = Vec::new();
        for item in &order.items {
            match articles.get(&item.article_id) {
                Some(article) if stock::can_fulfill(article, item.quantity) => {}
                _ => shortages.push(item.name.clone()),
            }
        }
        if !shortages.is_empty() {
            tx.rollback().await?;
            return Err(RepositoryError::OutOfStock(shortages));
        }

        for item in &order.items {
            if let Some(article) = articles.get(&item.article_id)
                && !article.ignore_stock
            {
                sqlx::query("UPDATE article SET stock = stock - $2 WHERE id = $1")
                    .bind(item.article_id.as_i64())
                    .bind(i64::from(item.quantity))
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let (order_id, created_at) = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            "INSERT INTO orders (order_number, status, payment_method_id, payment_method_type, \
             shipping_method_id, email, customer_name, ship_line1, ship_line2, ship_city, \
             ship_postal_code, ship_country, bill_line1, bill_line2, bill_city, \
             bill_postal_code, bill_country, currency, subtotal, shipping_cost, payment_fee, \
             tax_amount, discount_amount, total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23, $24) \
             RETURNING id, created_at",
        )
        .bind(&order.order_number)
        .bind(OrderStatus::Pending.as_str())
        .bind(order.payment_method_id.as_i64())
        .bind(order.payment_method_type.as_str())
        .bind(order.shipping_method_id.as_i64())
        .bind(order.email.as_str())
        .bind(&order.customer_name)
        .bind(&order.shipping_address.line1)
        .bind(&order.shipping_address.line2)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.postal_code)
        .bind(&order.shipping_address.country)
        .bind(&order.billing_address.line1)
        .bind(&order.billing_address.line2)
        .bind(&order.billing_address.city)
        .bind(&order.billing_address.postal_code)
        .bind(&order.billing_address.country)
        .bind(order.currency.as_str())
        .bind(order.totals.subtotal)
        .bind(order.totals.shipping_cost)
        .bind(order.totals.payment_fee)
        .bind(order.totals.tax_amount)
        .bind(order.totals.discount_amount)
        .bind(order.total)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "order number already exists"))?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_item (order_id, article_id, sku, name, unit_price, quantity) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(order_id)
            .bind(item.article_id.as_i64())
            .bind(&item.sku)
            .bind(&item.name)
            .bind(item.unit_price)
            .bind(i64::from(item.quantity))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Order {
            id: OrderId::new(order_id),
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
            created_at,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
        })
    }

    async fn update_order(&self, order: &Order) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, transaction_id = $3, paid_at = $4, \
             shipped_at = $5, delivered_at = $6, cancelled_at = $7 WHERE id = $1",
        )
        .bind(order.id.as_i64())
        .bind(order.status.as_str())
        .bind(&order.transaction_id)
        .bind(order.paid_at)
        .bind(order.shipped_at)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;
        row.map(OrderRow::into_order).transpose()
    }

    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, article_id, sku, name, unit_price, quantity \
             FROM order_item WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(OrderItemRow::into_item).collect()
    }
}
