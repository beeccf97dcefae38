//! Rate limiting for cart mutation using governor.
//!
//! A keyed token bucket per client IP guards `POST /cart/add` (the default
//! quota is 30 calls per 60 seconds). governor's check-and-decrement is
//! atomic, which is all the shared state this limiter needs. Violations are
//! rejected with the JSON error envelope before any persistent state is
//! touched.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::state::AppState;

type KeyedLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// Shared token bucket keyed by client IP.
#[derive(Clone)]
pub struct CartRateLimiter {
    limiter: Arc<KeyedLimiter>,
}

impl CartRateLimiter {
    /// Build a limiter from configuration: `burst` tokens refilling evenly
    /// over `window_secs`.
    ///
    /// # Panics
    ///
    /// Will not panic: burst and window are clamped to at least 1, so the
    /// quota period is always positive and accepted by governor.
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        let burst = NonZeroU32::new(config.add_to_cart_burst.max(1))
            .expect("burst is clamped to at least 1");
        let window = config.window_secs.max(1);
        #[allow(clippy::cast_precision_loss)] // window/burst are small config values
        let period = Duration::from_secs_f64(window as f64 / f64::from(burst.get()));
        let quota = Quota::with_period(period)
            .expect("period is positive")
            .allow_burst(burst);
        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    /// Atomically take one token for `ip`. Returns `false` when exhausted.
    #[must_use]
    pub fn check(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }
}

/// Best-effort client IP: proxy headers first, then the socket peer address.
///
/// Clients where neither is available share one bucket, which fails toward
/// stricter limiting rather than none.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
    // X-Forwarded-For: first IP in the chain
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    peer.map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |addr| addr.ip())
}

/// Axum middleware enforcing the add-to-cart rate limit.
///
/// # Errors
///
/// Returns [`AppError::RateLimited`] (429) when the client's bucket is empty.
pub async fn cart_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ip = client_ip(request.headers(), peer);
    if !state.cart_limiter().check(ip) {
        tracing::warn!(client_ip = %ip, "add-to-cart rate limit exceeded");
        return Err(AppError::RateLimited);
    }
    Ok(next.run(request).await)
}
