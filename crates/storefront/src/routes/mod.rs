//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check (storage reachable)
//!
//! # Cart (JSON)
//! GET    /cart                   - Current cart (never creates one)
//! POST   /cart/add               - Add article (rate limited)
//! PUT    /cart/update/{item_id}  - Overwrite line quantity
//! DELETE /cart/remove/{item_id}  - Remove line
//!
//! # Checkout (JSON)
//! GET  /checkout/methods         - Active payment & shipping methods
//! POST /checkout/process         - Assemble order from cart and pay
//! ```
//!
//! All mutating routes pass the origin check; `POST /cart/add` additionally
//! passes the per-client rate limiter.

pub mod cart;
pub mod checkout;

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::middleware;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route(
            "/add",
            post(cart::add).layer(from_fn_with_state(
                state.clone(),
                middleware::cart_rate_limit,
            )),
        )
        .route("/update/{item_id}", put(cart::update))
        .route("/remove/{item_id}", delete(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/methods", get(checkout::methods))
        .route("/process", post(checkout::process))
}

/// Create all routes for the storefront.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes(state))
        .nest("/checkout", checkout_routes())
        // Origin check on everything mutating under /cart and /checkout
        .layer(from_fn_with_state(state.clone(), middleware::verify_origin))
}
