//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions)
//! 5. Origin check (reject cross-site mutations)
//! 6. Rate limiting (governor, `POST /cart/add` only)

pub mod origin;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use origin::verify_origin;
pub use rate_limit::{CartRateLimiter, cart_rate_limit, client_ip};
pub use request_id::request_id_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
