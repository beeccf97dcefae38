//! Cart route handlers.
//!
//! All cart endpoints answer with the full updated cart, so clients never
//! have to stitch partial responses together.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use meridian_core::{ArticleId, CartItemId, VariantId};
use rust_decimal::Decimal;

use crate::error::AppError;
use crate::models::session::remember_cart_id;
use crate::models::{CartItem, CartTotals, RequestIdentity};
use crate::services::CartService;
use crate::state::AppState;

/// One cart line as returned to clients.
#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub article_id: ArticleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id,
            article_id: item.article_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total(),
        }
    }
}

/// Cart totals as returned to clients.
#[derive(Debug, Serialize)]
pub struct TotalsView {
    pub subtotal: Decimal,
    pub item_count: u32,
}

/// The cart response envelope.
#[derive(Debug, Serialize)]
pub struct CartEnvelope {
    pub items: Vec<CartItemView>,
    pub totals: TotalsView,
}

impl CartEnvelope {
    fn of(items: &[CartItem], totals: CartTotals) -> Self {
        Self {
            items: items.iter().map(CartItemView::from).collect(),
            totals: TotalsView {
                subtotal: totals.subtotal,
                item_count: totals.item_count,
            },
        }
    }

    fn empty() -> Self {
        Self {
            items: Vec::new(),
            totals: TotalsView {
                subtotal: Decimal::ZERO,
                item_count: 0,
            },
        }
    }
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub article_id: ArticleId,
    pub quantity: Option<u32>,
    pub variant_id: Option<VariantId>,
}

/// Update cart item request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: u32,
}

/// `GET /cart` - the current cart, without creating one.
#[instrument(skip(state, identity))]
pub async fn show(
    State(state): State<AppState>,
    identity: RequestIdentity,
) -> Result<Json<CartEnvelope>, AppError> {
    let carts = CartService::new(state.store());
    let Some(cart) = carts.peek(&identity).await? else {
        return Ok(Json(CartEnvelope::empty()));
    };
    let (items, totals) = carts.view(&cart).await?;
    Ok(Json(CartEnvelope::of(&items, totals)))
}

/// `POST /cart/add` - add an article, creating the cart if needed.
#[instrument(skip(state, session, identity, request))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    identity: RequestIdentity,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartEnvelope>, AppError> {
    let carts = CartService::new(state.store());
    let cart = carts.resolve(&identity, state.config().currency).await?;
    remember_cart_id(&session, cart.id).await?;

    carts
        .add_item(
            &cart,
            request.article_id,
            request.variant_id,
            request.quantity.unwrap_or(1),
        )
        .await?;

    let (items, totals) = carts.view(&cart).await?;
    Ok(Json(CartEnvelope::of(&items, totals)))
}

/// `PUT /cart/update/{item_id}` - overwrite a line's quantity.
#[instrument(skip(state, session, identity, request))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    identity: RequestIdentity,
    Path(item_id): Path<CartItemId>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<CartEnvelope>, AppError> {
    let carts = CartService::new(state.store());
    let cart = carts.resolve(&identity, state.config().currency).await?;
    remember_cart_id(&session, cart.id).await?;

    carts.update_item(&cart, item_id, request.quantity).await?;

    let (items, totals) = carts.view(&cart).await?;
    Ok(Json(CartEnvelope::of(&items, totals)))
}

/// `DELETE /cart/remove/{item_id}` - remove a line.
#[instrument(skip(state, session, identity))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    identity: RequestIdentity,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<CartEnvelope>, AppError> {
    let carts = CartService::new(state.store());
    let cart = carts.resolve(&identity, state.config().currency).await?;
    remember_cart_id(&session, cart.id).await?;

    carts.remove_item(&cart, item_id).await?;

    let (items, totals) = carts.view(&cart).await?;
    Ok(Json(CartEnvelope::of(&items, totals)))
}
